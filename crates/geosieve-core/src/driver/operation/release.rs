use super::Operation;

#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
}

impl From<Release> for Operation {
    fn from(value: Release) -> Self {
        Self::Release(value)
    }
}
