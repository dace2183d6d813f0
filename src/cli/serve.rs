use std::path::Path;

use anyhow::Result;

use crate::web::run_server;

pub async fn handle_serve(port: u16, db: &Path, top_k: usize, api_key: &str) -> Result<()> {
    let query = super::build_query_service(db, top_k, api_key)?;
    run_server("0.0.0.0", port, query).await
}
