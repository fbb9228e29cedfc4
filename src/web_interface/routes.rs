use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{attachment_disposition, ApiError, BackupListResponse, DeleteResponse};
use crate::vault::Vault;

fn error_response(message: &str, status: StatusCode) -> reply::Response {
    reply::with_status(reply::json(&ApiError::new(message)), status).into_response()
}

fn parse_id(id_str: &str) -> Result<Uuid, reply::Response> {
    Uuid::parse_str(id_str)
        .map_err(|_| error_response("Invalid backup id", StatusCode::BAD_REQUEST))
}

fn with_vault(
    vault: Arc<Vault>,
) -> impl Filter<Extract = (Arc<Vault>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || vault.clone())
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        let html = r#"<html><head><title>Audio Vault</title></head>
                <body><h1>Audio Vault is running</h1><p>See /backups for JSON.</p></body></html>"#;
        Ok::<_, Rejection>(reply::html(html))
    })
}

/// GET /backups
pub fn list_backups_route(
    vault: Arc<Vault>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("backups")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_vault(vault))
        .and_then(|vault: Arc<Vault>| async move {
            Ok::<_, Rejection>(list_backups(&vault).await)
        })
}

/// GET /backups/:id/blob
pub fn download_blob_route(
    vault: Arc<Vault>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("backups" / String / "blob")
        .and(warp::get())
        .and(with_vault(vault))
        .and_then(|id_str: String, vault: Arc<Vault>| async move {
            Ok::<_, Rejection>(download_blob(&vault, &id_str).await)
        })
}

/// DELETE /backups/:id
pub fn delete_backup_route(
    vault: Arc<Vault>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("backups" / String)
        .and(warp::delete())
        .and(with_vault(vault))
        .and_then(|id_str: String, vault: Arc<Vault>| async move {
            Ok::<_, Rejection>(delete_backup(&vault, &id_str).await)
        })
}

/// All routes served by the web interface.
pub fn routes(vault: Arc<Vault>) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    dashboard_route()
        .or(list_backups_route(vault.clone()))
        .or(download_blob_route(vault.clone()))
        .or(delete_backup_route(vault))
}

pub async fn list_backups(vault: &Vault) -> reply::Response {
    match vault.list().await {
        Ok(records) => {
            let summaries = records.iter().map(|r| r.summary()).collect();
            reply::with_status(
                reply::json(&BackupListResponse::new(summaries)),
                StatusCode::OK,
            )
            .into_response()
        }
        Err(e) => {
            warn!("Failed to list backups: {}", e);
            error_response("Failed to load backups", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn download_blob(vault: &Vault, id_str: &str) -> reply::Response {
    let id = match parse_id(id_str) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match vault.get(id).await {
        Ok(Some(record)) => {
            debug!("Serving backup {} ({} bytes)", id, record.size());
            let content_type = record.content_type();
            let disposition = attachment_disposition(&record.filename);
            reply::with_status(
                reply::with_header(
                    reply::with_header(record.blob, "Content-Type", content_type),
                    "Content-Disposition",
                    disposition,
                ),
                StatusCode::OK,
            )
            .into_response()
        }
        Ok(None) => error_response("Backup not found", StatusCode::NOT_FOUND),
        Err(e) => {
            warn!("Failed to read backup {}: {}", id, e);
            error_response("Failed to load backup", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn delete_backup(vault: &Vault, id_str: &str) -> reply::Response {
    let id = match parse_id(id_str) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match vault.delete(id).await {
        Ok(deleted) => reply::with_status(
            reply::json(&DeleteResponse { id, deleted }),
            StatusCode::OK,
        )
        .into_response(),
        Err(e) => {
            warn!("Failed to delete backup {}: {}", id, e);
            error_response("Failed to delete backup", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Backend, Config};
    use tempfile::TempDir;

    async fn file_vault(dir: &TempDir) -> Vault {
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            backend: Backend::File,
            broadcast: false,
            ..Config::default()
        };
        Vault::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn blob_download_sets_type_and_disposition() {
        let dir = TempDir::new().unwrap();
        let vault = file_vault(&dir).await;
        let id = vault.save(vec![1u8; 64], "session-1.wav").await.unwrap();

        let res = download_blob(&vault, &id.to_string()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert!(headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("audio/"));
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"session-1.wav\""
        );
    }

    #[tokio::test]
    async fn blob_download_rejects_bad_and_unknown_ids() {
        let dir = TempDir::new().unwrap();
        let vault = file_vault(&dir).await;

        let res = download_blob(&vault, "not-a-uuid").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = download_blob(&vault, &Uuid::new_v4().to_string()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_goes_through_the_vault() {
        let dir = TempDir::new().unwrap();
        let vault = file_vault(&dir).await;
        let id = vault.save(vec![9u8; 8], "gone.webm").await.unwrap();

        let res = delete_backup(&vault, &id.to_string()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(vault.list().await.unwrap().is_empty());

        let res = delete_backup(&vault, &id.to_string()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = delete_backup(&vault, "nope").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_is_json() {
        let dir = TempDir::new().unwrap();
        let vault = file_vault(&dir).await;
        vault.save(vec![0u8; 3], "a.wav").await.unwrap();

        let res = list_backups(&vault).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/json");
    }
}
