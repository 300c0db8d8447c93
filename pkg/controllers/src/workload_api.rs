use async_trait::async_trait;

use pkg_constants::state::DEPLOYMENT_PREFIX;
use pkg_state::client::StateStore;
use pkg_types::deployment::Deployment;
use pkg_types::selector::WorkloadSelector;

/// The cluster-API surface the scaler depends on. Kept to three
/// operations so actuation logic is independent of any transport and
/// testable against an in-memory fake.
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// Enumerate deployments in `namespace` whose labels satisfy `selector`.
    async fn list_workloads(
        &self,
        selector: &WorkloadSelector,
        namespace: &str,
    ) -> anyhow::Result<Vec<Deployment>>;

    /// Set the desired replica count of one deployment.
    async fn update_replicas(&self, namespace: &str, id: &str, replicas: u32)
    -> anyhow::Result<()>;

    /// Write (`Some`) or clear (`None`) an annotation on one deployment.
    async fn set_annotation(
        &self,
        namespace: &str,
        id: &str,
        key: &str,
        value: Option<String>,
    ) -> anyhow::Result<()>;
}

/// `WorkloadApi` backed by the registry in the state store.
pub struct StoreWorkloadApi {
    store: StateStore,
}

impl StoreWorkloadApi {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    async fn load(&self, namespace: &str, id: &str) -> anyhow::Result<(String, Deployment)> {
        let key = format!("{}{}/{}", DEPLOYMENT_PREFIX, namespace, id);
        let data = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| anyhow::anyhow!("deployment {}/{} not found", namespace, id))?;
        let deploy: Deployment = serde_json::from_slice(&data)?;
        Ok((key, deploy))
    }

    async fn save(&self, key: &str, deploy: &Deployment) -> anyhow::Result<()> {
        let data = serde_json::to_vec(deploy)?;
        self.store.put(key, &data).await
    }
}

#[async_trait]
impl WorkloadApi for StoreWorkloadApi {
    async fn list_workloads(
        &self,
        selector: &WorkloadSelector,
        namespace: &str,
    ) -> anyhow::Result<Vec<Deployment>> {
        let prefix = format!("{}{}/", DEPLOYMENT_PREFIX, namespace);
        let entries = self.store.list_prefix(&prefix).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_slice::<Deployment>(&v).ok())
            .filter(|d| selector.matches(&d.labels))
            .collect())
    }

    async fn update_replicas(
        &self,
        namespace: &str,
        id: &str,
        replicas: u32,
    ) -> anyhow::Result<()> {
        let (key, mut deploy) = self.load(namespace, id).await?;
        if deploy.spec.replicas == replicas {
            return Ok(());
        }
        deploy.spec.replicas = replicas;
        deploy.generation += 1;
        self.save(&key, &deploy).await
    }

    async fn set_annotation(
        &self,
        namespace: &str,
        id: &str,
        key: &str,
        value: Option<String>,
    ) -> anyhow::Result<()> {
        let (store_key, mut deploy) = self.load(namespace, id).await?;
        match value {
            Some(v) => {
                deploy.annotations.insert(key.to_string(), v);
            }
            None => {
                deploy.annotations.remove(key);
            }
        }
        self.save(&store_key, &deploy).await
    }
}
