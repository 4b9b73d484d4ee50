use crate::cli::actions::Action;
use crate::gather::{self, ServerConfig};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            secret,
            https,
            cert,
            key,
        } => {
            let config = ServerConfig {
                port,
                dsn,
                secret,
                https,
                cert,
                key,
            };

            gather::new(config).await?;
        }
    }

    Ok(())
}
