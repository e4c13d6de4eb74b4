use super::Classifier;
use crate::error::SetupError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Named classifier instances available at setup time
#[derive(Default, Clone)]
pub struct ClassifierRegistry {
    classifiers: HashMap<String, Arc<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier under its own name, replacing any previous entry
    pub fn register(&mut self, classifier: Arc<dyn Classifier>) {
        let name = classifier.name().to_string();
        if self.classifiers.insert(name.clone(), classifier).is_some() {
            warn!("Replacing classifier registered as '{}'", name);
        } else {
            debug!("Registered classifier '{}'", name);
        }
    }

    pub fn with(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.register(classifier);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Classifier>, SetupError> {
        self.classifiers
            .get(name)
            .cloned()
            .ok_or_else(|| SetupError::UnknownClassifier {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}
