//! Layer service

use std::sync::Arc;

use crate::domain::FeatureResult;
use crate::models::LayerListOut;
use crate::store::Store;

#[derive(Clone)]
pub struct LayerService {
    store: Arc<dyn Store>,
}

impl LayerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_layers(&self) -> FeatureResult<LayerListOut> {
        let layers = self.store.list_layers().await?;
        Ok(LayerListOut {
            layers: layers.iter().map(|l| l.to_out()).collect(),
        })
    }
}
