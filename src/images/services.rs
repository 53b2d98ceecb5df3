use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::Image;
use crate::error::AppError;
use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/png" => Some("png"),
        "image/jpg" => Some("jpg"),
        "image/jpeg" => Some("jpeg"),
        _ => None,
    }
}

/// One picture per user, so the key is fixed apart from the extension.
pub fn object_key(user_id: Uuid, ext: &str) -> String {
    format!("{}/image-file.{}", user_id, ext)
}

#[instrument(skip(st, file))]
pub async fn upload_profile_picture(
    st: &AppState,
    user_id: Uuid,
    target_user_id: Option<&str>,
    file: Option<UploadItem>,
) -> Result<Image, AppError> {
    if let Some(target) = target_user_id {
        let target: Uuid = target
            .parse()
            .map_err(|_| AppError::validation("Invalid userId."))?;
        if target != user_id {
            warn!(%user_id, target_user_id = %target, "picture upload for another account");
            return Err(AppError::Forbidden(
                "You are not allowed to upload a profile picture to this account.".into(),
            ));
        }
    }

    let Some((file, ext)) = file.and_then(|f| ext_from_mime(&f.content_type).map(|ext| (f, ext)))
    else {
        return Err(AppError::validation(
            "Unsupported file format. Please upload a PNG, JPG, or JPEG file.",
        ));
    };

    if st.images.find_by_user(user_id).await?.is_some() {
        return Err(conflict());
    }

    let key = object_key(user_id, ext);
    st.storage
        .put_object(&key, file.body, &file.content_type)
        .await?;
    let url = st.storage.object_url(&key);

    let Some(image) = st.images.insert(user_id, &key, &url).await? else {
        // a concurrent upload won; drop our bytes unless they share its key
        if let Some(existing) = st.images.find_by_user(user_id).await? {
            if existing.file_name != key {
                if let Err(e) = st.storage.delete_object(&key).await {
                    warn!(%user_id, %key, error = %format!("{e:#}"), "orphaned upload");
                }
            }
        }
        return Err(conflict());
    };

    info!(%user_id, file_name = %image.file_name, "profile picture uploaded");
    Ok(image)
}

fn conflict() -> AppError {
    AppError::Conflict(
        "There is already a profile picture. Please delete it before uploading a new one.".into(),
    )
}

#[instrument(skip(st))]
pub async fn get_profile_picture(st: &AppState, user_id: Uuid) -> Result<Image, AppError> {
    st.images
        .find_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile picture not found.".into()))
}

#[instrument(skip(st))]
pub async fn delete_profile_picture(st: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let image = get_profile_picture(st, user_id).await?;

    st.storage.delete_object(&image.file_name).await?;
    st.images.delete(image.id).await?;

    info!(%user_id, file_name = %image.file_name, "profile picture deleted");
    Ok(())
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::testing::fake_state;

    fn png() -> Option<UploadItem> {
        Some(UploadItem {
            body: Bytes::from_static(b"\x89PNG"),
            content_type: "image/png".into(),
        })
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpeg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_get_delete() {
        let (st, fakes) = fake_state();
        let id = Uuid::new_v4();

        let image = upload_profile_picture(&st, id, None, png()).await.unwrap();
        assert_eq!(image.file_name, format!("{id}/image-file.png"));
        assert_eq!(image.url, format!("https://test-bucket.s3.amazonaws.com/{id}/image-file.png"));
        assert_eq!(image.user_id, id);
        {
            let objects = fakes.storage.objects.lock().unwrap();
            let (_, ct) = objects.get(&image.file_name).unwrap();
            assert_eq!(ct, "image/png");
        }

        assert_eq!(get_profile_picture(&st, id).await.unwrap().id, image.id);

        delete_profile_picture(&st, id).await.unwrap();
        assert!(fakes.storage.objects.lock().unwrap().is_empty());
        assert_eq!(fakes.images.count(), 0);
        assert!(matches!(
            get_profile_picture(&st, id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            delete_profile_picture(&st, id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn second_upload_conflicts() {
        let (st, _) = fake_state();
        let id = Uuid::new_v4();
        upload_profile_picture(&st, id, None, png()).await.unwrap();
        assert!(matches!(
            upload_profile_picture(&st, id, None, png()).await.unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn other_users_target_is_forbidden() {
        let (st, _) = fake_state();
        let id = Uuid::new_v4();
        let other = Uuid::new_v4().to_string();
        assert!(matches!(
            upload_profile_picture(&st, id, Some(&other), png()).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        // own id is fine
        let own = id.to_string();
        assert!(upload_profile_picture(&st, id, Some(&own), png()).await.is_ok());
    }

    #[tokio::test]
    async fn target_id_is_compared_as_uuid() {
        let (st, _) = fake_state();
        let id = Uuid::new_v4();
        let upper = id.to_string().to_uppercase();
        assert!(upload_profile_picture(&st, id, Some(&upper), png()).await.is_ok());

        let other = Uuid::new_v4();
        assert!(matches!(
            upload_profile_picture(&st, other, Some("not-a-uuid"), png())
                .await
                .unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn rejects_unsupported_or_missing_file() {
        let (st, fakes) = fake_state();
        let gif = Some(UploadItem {
            body: Bytes::from_static(b"GIF89a"),
            content_type: "image/gif".into(),
        });
        for file in [gif, None] {
            assert!(matches!(
                upload_profile_picture(&st, Uuid::new_v4(), None, file)
                    .await
                    .unwrap_err(),
                AppError::Validation(_)
            ));
        }
        assert!(fakes.storage.objects.lock().unwrap().is_empty());
    }
}
