use crate::backend::{BuildSpec, ContainerRuntime, ExecSpec, RunSpec};
use crate::RuntimeError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// A call observed by [`MockRuntime`], in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Pull(String),
    Build(BuildSpec),
    RemoveImage(String),
    Run(RunSpec),
    Start(String),
    Stop(String),
    RemoveContainer(String),
    Exec(ExecSpec),
}

#[derive(Debug, Default)]
struct MockState {
    images: BTreeSet<String>,
    /// container name -> running
    containers: BTreeMap<String, bool>,
    calls: Vec<MockCall>,
}

/// In-memory container engine. Clones share state, so a test can keep a handle
/// after moving one into an engine.
#[derive(Debug, Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(self, image: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.images.insert(image.to_owned());
        }
        self
    }

    #[must_use]
    pub fn with_container(self, name: &str, running: bool) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.containers.insert(name.to_owned(), running);
        }
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn images(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.images.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn containers(&self) -> Vec<String> {
        self.lock()
            .map(|s| s.containers.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))
    }

    fn set_running(&self, name: &str, running: bool, call: MockCall) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        match state.containers.get_mut(name) {
            Some(flag) => *flag = running,
            None => return Err(no_such_container(name)),
        }
        state.calls.push(call);
        Ok(())
    }
}

fn no_such_container(name: &str) -> RuntimeError {
    RuntimeError::ExecFailed(format!("no such container: {name}"))
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        Ok(self.lock()?.images.contains(image))
    }

    fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.images.insert(image.to_owned());
        state.calls.push(MockCall::Pull(image.to_owned()));
        Ok(())
    }

    fn build_image(&self, spec: &BuildSpec) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state.images.insert(spec.tag.clone());
        state.calls.push(MockCall::Build(spec.clone()));
        Ok(())
    }

    fn remove_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if !state.images.remove(image) {
            return Err(RuntimeError::ExecFailed(format!("no such image: {image}")));
        }
        state.calls.push(MockCall::RemoveImage(image.to_owned()));
        Ok(())
    }

    fn list_images(&self, prefix: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .lock()?
            .images
            .iter()
            .filter(|i| i.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn container_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.lock()?.containers.contains_key(name))
    }

    fn container_running(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.lock()?.containers.get(name).copied().unwrap_or(false))
    }

    fn run_container(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::ExecFailed(format!(
                "container name already in use: {}",
                spec.name
            )));
        }
        if !state.images.contains(&spec.image) {
            return Err(RuntimeError::ExecFailed(format!(
                "no such image: {}",
                spec.image
            )));
        }
        state.containers.insert(spec.name.clone(), true);
        state.calls.push(MockCall::Run(spec.clone()));
        Ok(())
    }

    fn start_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.set_running(name, true, MockCall::Start(name.to_owned()))
    }

    fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.set_running(name, false, MockCall::Stop(name.to_owned()))
    }

    fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        match state.containers.get(name) {
            None => return Err(no_such_container(name)),
            Some(true) => {
                return Err(RuntimeError::ExecFailed(format!(
                    "cannot remove running container: {name}"
                )))
            }
            Some(false) => {}
        }
        state.containers.remove(name);
        state.calls.push(MockCall::RemoveContainer(name.to_owned()));
        Ok(())
    }

    fn list_containers(&self, prefix: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .lock()?
            .containers
            .keys()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn exec(&self, spec: &ExecSpec) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if state.containers.get(&spec.container) != Some(&true) {
            return Err(RuntimeError::ExecFailed(format!(
                "container is not running: {}",
                spec.container
            )));
        }
        state.calls.push(MockCall::Exec(spec.clone()));
        Ok(())
    }
}
