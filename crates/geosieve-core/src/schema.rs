mod dataset;
pub use dataset::{Dataset, DatasetId};

mod srid;
pub use srid::is_geographic;

use crate::{Error, Result};

use indexmap::IndexMap;

/// The set of datasets the engine can filter.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    datasets: IndexMap<DatasetId, Dataset>,
}

impl Schema {
    pub fn new(datasets: impl IntoIterator<Item = Dataset>) -> Schema {
        Schema {
            datasets: datasets
                .into_iter()
                .map(|dataset| (dataset.id.clone(), dataset))
                .collect(),
        }
    }

    pub fn dataset(&self, id: &DatasetId) -> Result<&Dataset> {
        self.datasets
            .get(id)
            .ok_or_else(|| Error::invalid_request(format!("unknown dataset `{id}`")))
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }
}
