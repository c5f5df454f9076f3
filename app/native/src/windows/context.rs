//! State shared by every window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;

use crate::config::StarConfig;
use crate::objects::ObjectStore;
use crate::services::{BackendError, ServiceReturn, Services};
use crate::tabs::TabViewPool;

/// Services, caches and process-wide flags the windows work with.
pub struct ShellContext {
    pub services: Services,
    pub store: ObjectStore,
    pub pool: TabViewPool,
    pub config: Arc<StarConfig>,
    client_id: OnceCell<String>,
    quitting: AtomicBool,
    relaunching: AtomicBool,
}

impl ShellContext {
    #[must_use]
    pub fn new(services: Services, store: ObjectStore, pool: TabViewPool, config: Arc<StarConfig>) -> Self {
        Self {
            services,
            store,
            pool,
            config,
            client_id: OnceCell::new(),
            quitting: AtomicBool::new(false),
            relaunching: AtomicBool::new(false),
        }
    }

    /// The client id, fetched once.
    ///
    /// # Errors
    ///
    /// Returns the backend error of `GetClientData`; the next call retries.
    pub async fn client_id(&self) -> Result<String, BackendError> {
        let id = self
            .client_id
            .get_or_try_init(|| async {
                let client = self.services.clients.get_client_data().await?;
                Ok::<_, BackendError>(client.oid)
            })
            .await?;
        Ok(id.clone())
    }

    /// Applies the companion updates of a service response.
    pub fn apply<T>(&self, ret: ServiceReturn<T>) -> T { self.store.apply_service_return(ret) }

    #[must_use]
    pub fn is_quitting(&self) -> bool { self.quitting.load(Ordering::Acquire) }

    pub fn set_quitting(&self, quitting: bool) { self.quitting.store(quitting, Ordering::Release); }

    #[must_use]
    pub fn is_relaunching(&self) -> bool { self.relaunching.load(Ordering::Acquire) }

    pub(crate) fn set_relaunching(&self, relaunching: bool) {
        self.relaunching.store(relaunching, Ordering::Release);
    }
}

impl std::fmt::Debug for ShellContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellContext")
            .field("store", &self.store)
            .field("pool", &self.pool)
            .field("quitting", &self.is_quitting())
            .field("relaunching", &self.is_relaunching())
            .finish_non_exhaustive()
    }
}
