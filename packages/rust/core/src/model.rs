//! Text-generation backends and the ordered-preference model resolver.
//!
//! A [`ModelBackend`] knows how to construct a [`TextModel`] for a model
//! identifier. [`resolve`] walks the configured identifiers in order and binds
//! a [`ModelHandle`] to the first one that constructs. Construction never makes
//! a network call; a bad identifier or key only shows up on the first
//! `generate`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use seostudio_shared::{FallbackPolicy, Result, SeoStudioError};
use tracing::{debug, info, warn};

/// Future returned by [`TextModel::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// A single text-completion capability: prompt in, text out.
pub trait TextModel: Send + Sync {
    /// Identifier the model was constructed for.
    fn model_id(&self) -> &str;

    /// Run one completion. Failures are [`SeoStudioError::Generation`].
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}

/// Constructs models by identifier.
pub trait ModelBackend: Send + Sync {
    fn construct(&self, model_id: &str) -> Result<Arc<dyn TextModel>>;
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Bind a handle to the first identifier in `model_ids` that constructs.
///
/// Identifiers after the first success are never touched. Fails with
/// [`SeoStudioError::NoBackendAvailable`] only when every identifier fails.
pub fn resolve(
    backend: Arc<dyn ModelBackend>,
    model_ids: &[String],
    fallback: FallbackPolicy,
) -> Result<ModelHandle> {
    let (index, model) = construct_from(backend.as_ref(), model_ids, 0)?;
    info!(model = model.model_id(), ?fallback, "model resolved");

    Ok(ModelHandle {
        backend,
        model_ids: model_ids.to_vec(),
        fallback,
        active: RwLock::new(Active { index, model }),
    })
}

/// Try identifiers from `start` onward; return the first that constructs.
fn construct_from(
    backend: &dyn ModelBackend,
    model_ids: &[String],
    start: usize,
) -> Result<(usize, Arc<dyn TextModel>)> {
    let mut tried = Vec::new();

    for (index, id) in model_ids.iter().enumerate().skip(start) {
        match backend.construct(id) {
            Ok(model) => return Ok((index, model)),
            Err(e) => {
                warn!(model = %id, error = %e, "model construction failed");
                tried.push(id.as_str());
            }
        }
    }

    Err(SeoStudioError::NoBackendAvailable {
        tried: if tried.is_empty() {
            "none".to_string()
        } else {
            tried.join(", ")
        },
    })
}

// ---------------------------------------------------------------------------
// ModelHandle
// ---------------------------------------------------------------------------

struct Active {
    index: usize,
    model: Arc<dyn TextModel>,
}

/// A resolved model, reused across pages.
///
/// With [`FallbackPolicy::Pinned`] the bound model never changes. With
/// [`FallbackPolicy::ReResolve`] a failed call constructs the next identifier
/// in preference order, retries the same prompt on it, and stays there.
pub struct ModelHandle {
    backend: Arc<dyn ModelBackend>,
    model_ids: Vec<String>,
    fallback: FallbackPolicy,
    active: RwLock<Active>,
}

impl ModelHandle {
    /// The model currently in use.
    fn current(&self) -> (usize, Arc<dyn TextModel>) {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        (active.index, Arc::clone(&active.model))
    }

    fn switch_to(&self, index: usize, model: Arc<dyn TextModel>) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may already have moved further down the list.
        if index > active.index {
            *active = Active { index, model };
        }
    }

    async fn generate_with_fallback(&self, prompt: &str) -> Result<String> {
        let (mut index, mut model) = self.current();

        loop {
            let err = match model.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if self.fallback == FallbackPolicy::Pinned {
                return Err(err);
            }

            warn!(model = model.model_id(), error = %err, "generation failed, trying next model");
            match construct_from(self.backend.as_ref(), &self.model_ids, index + 1) {
                Ok((next_index, next_model)) => {
                    debug!(model = next_model.model_id(), "re-resolved model");
                    self.switch_to(next_index, Arc::clone(&next_model));
                    index = next_index;
                    model = next_model;
                }
                // List exhausted: report the call failure, not the resolution.
                Err(_) => return Err(err),
            }
        }
    }
}

impl TextModel for ModelHandle {
    /// Identifier of the model currently bound; moves forward under re-resolve.
    fn model_id(&self) -> &str {
        self.model_ids
            .get(self.current().0)
            .map_or("", String::as_str)
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.generate_with_fallback(prompt))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory models for pipeline tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replies from a queue; records every prompt it receives.
    pub struct ScriptedModel {
        id: String,
        replies: Mutex<VecDeque<Result<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<String>>) -> Self {
            Self::named("scripted", replies)
        }

        pub fn named(id: &str, replies: Vec<Result<String>>) -> Self {
            Self {
                id: id.to_string(),
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn prompt(&self, i: usize) -> String {
            self.prompts.lock().unwrap()[i].clone()
        }
    }

    impl TextModel for ScriptedModel {
        fn model_id(&self) -> &str {
            &self.id
        }

        fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SeoStudioError::Generation("script exhausted".into())));
            Box::pin(async move { reply })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::testing::ScriptedModel;
    use super::*;

    /// Fails construction for ids in `broken`; records every construct call.
    struct FakeBackend {
        broken: Vec<&'static str>,
        failing_calls: Vec<&'static str>,
        constructed: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(broken: &[&'static str]) -> Self {
            Self {
                broken: broken.to_vec(),
                failing_calls: Vec::new(),
                constructed: Mutex::new(Vec::new()),
            }
        }
    }

    impl ModelBackend for FakeBackend {
        fn construct(&self, model_id: &str) -> Result<Arc<dyn TextModel>> {
            self.constructed.lock().unwrap().push(model_id.to_string());
            if self.broken.contains(&model_id) {
                return Err(SeoStudioError::config(format!("unknown model {model_id}")));
            }
            let reply = if self.failing_calls.contains(&model_id) {
                Err(SeoStudioError::Generation("quota".into()))
            } else {
                Ok(format!("from {model_id}"))
            };
            Ok(Arc::new(ScriptedModel::named(model_id, vec![reply])))
        }
    }

    fn ids() -> Vec<String> {
        ["m1", "m2", "m3", "m4"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_first_constructible_and_stops() {
        let backend = Arc::new(FakeBackend::new(&["m1", "m2"]));
        let handle = resolve(backend.clone(), &ids(), FallbackPolicy::Pinned).unwrap();

        assert_eq!(handle.model_id(), "m3");
        assert_eq!(*backend.constructed.lock().unwrap(), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn all_failing_is_no_backend_available() {
        let backend = Arc::new(FakeBackend::new(&["m1", "m2", "m3", "m4"]));
        let err = resolve(backend, &ids(), FallbackPolicy::Pinned).err().unwrap();
        match err {
            SeoStudioError::NoBackendAvailable { tried } => assert_eq!(tried, "m1, m2, m3, m4"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_list_is_no_backend_available() {
        let backend = Arc::new(FakeBackend::new(&[]));
        let err = resolve(backend, &[], FallbackPolicy::Pinned).err().unwrap();
        assert!(matches!(err, SeoStudioError::NoBackendAvailable { .. }));
    }

    #[tokio::test]
    async fn pinned_surfaces_call_failure() {
        let mut backend = FakeBackend::new(&[]);
        backend.failing_calls = vec!["m1"];
        let backend = Arc::new(backend);
        let handle = resolve(backend.clone(), &ids(), FallbackPolicy::Pinned).unwrap();

        let err = handle.generate("p").await.unwrap_err();
        assert!(matches!(err, SeoStudioError::Generation(_)));
        assert_eq!(handle.model_id(), "m1");
        assert_eq!(backend.constructed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn re_resolve_moves_to_next_model_and_stays() {
        let mut backend = FakeBackend::new(&["m3"]);
        backend.failing_calls = vec!["m1", "m2"];
        let backend = Arc::new(backend);
        let handle = resolve(backend.clone(), &ids(), FallbackPolicy::ReResolve).unwrap();

        let text = handle.generate("p").await.unwrap();
        assert_eq!(text, "from m4");
        assert_eq!(handle.model_id(), "m4");
    }

    #[tokio::test]
    async fn re_resolve_exhausted_returns_call_error() {
        let mut backend = FakeBackend::new(&[]);
        backend.failing_calls = vec!["m1", "m2", "m3", "m4"];
        let handle = resolve(Arc::new(backend), &ids(), FallbackPolicy::ReResolve).unwrap();

        let err = handle.generate("p").await.unwrap_err();
        assert!(matches!(err, SeoStudioError::Generation(_)));
    }
}
