//! Client selection for admin commands.

use super::ClientArgs;
use crate::client::{AdminClient, IntentionsApi, LocalApi, MessagesApi};
use crate::config::Settings;
use crate::error::Result;
use crate::model::{IntentionMonth, MonthPayload};
use crate::storage::SqliteStorage;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Either a running server or the local database.
#[derive(Debug, Clone)]
pub enum Backend {
    Http(AdminClient),
    Local(LocalApi),
}

impl Backend {
    /// Build the backend the flags ask for.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` if `--local` points at a missing
    /// database, or `Error::Config` if the HTTP client cannot be built.
    pub fn connect(args: &ClientArgs, settings: &Settings, actor: &str) -> Result<Self> {
        if args.local {
            debug!(path = %settings.db_path.display(), "Using local database");
            let storage = SqliteStorage::open_existing(&settings.db_path)?;
            return Ok(Self::Local(LocalApi::new(Arc::new(Mutex::new(storage)), actor)));
        }

        debug!(url = %settings.api_url, "Using parish API");
        Ok(Self::Http(AdminClient::new(
            &settings.api_url,
            settings.admin_token.clone(),
            actor,
        )?))
    }

    /// Fail early if the server is unreachable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` if the health check cannot be made.
    pub async fn check(&self) -> Result<()> {
        match self {
            Self::Http(c) => c.health().await.map(|_| ()),
            Self::Local(_) => Ok(()),
        }
    }

    /// Where writes go, for display.
    #[must_use]
    pub fn describe(&self, settings: &Settings) -> String {
        match self {
            Self::Http(_) => settings.api_url.clone(),
            Self::Local(_) => settings.db_path.display().to_string(),
        }
    }
}

impl IntentionsApi for Backend {
    async fn list_months(&self, year: i32) -> Result<Vec<IntentionMonth>> {
        match self {
            Self::Http(c) => c.list_months(year).await,
            Self::Local(c) => c.list_months(year).await,
        }
    }

    async fn create_month(&self, payload: &MonthPayload) -> Result<IntentionMonth> {
        match self {
            Self::Http(c) => c.create_month(payload).await,
            Self::Local(c) => c.create_month(payload).await,
        }
    }

    async fn update_month(&self, id: i64, payload: &MonthPayload) -> Result<IntentionMonth> {
        match self {
            Self::Http(c) => c.update_month(id, payload).await,
            Self::Local(c) => c.update_month(id, payload).await,
        }
    }
}

impl MessagesApi for Backend {
    async fn unread_count(&self) -> Result<i64> {
        match self {
            Self::Http(c) => c.unread_count().await,
            Self::Local(c) => c.unread_count().await,
        }
    }
}
