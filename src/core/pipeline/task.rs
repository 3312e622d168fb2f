// ─── Pipeline Tasks ───
// Stage bookkeeping: per-stage state and progress, aggregated into one
// weighted progress value for the whole launch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::core::error::LauncherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Loading,
    Finished,
    Aborted,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Aborted | TaskState::Failed)
    }

    /// Waiting → Loading → terminal, or Waiting → Aborted for a task that
    /// never started. Nothing is ever re-entered.
    pub fn can_become(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Waiting, TaskState::Loading)
                | (TaskState::Waiting, TaskState::Aborted)
                | (TaskState::Loading, TaskState::Finished)
                | (TaskState::Loading, TaskState::Aborted)
                | (TaskState::Loading, TaskState::Failed)
        )
    }
}

/// Static description of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub name: &'static str,
    pub weight: u32,
    /// Blocking stages finish before the next one starts.
    pub blocking: bool,
    /// A failing optional stage does not fail the launch.
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineTask {
    pub spec: StageSpec,
    pub state: TaskState,
    pub progress: f64,
    pub error: Option<String>,
}

impl PipelineTask {
    pub fn new(spec: StageSpec) -> Self {
        Self {
            spec,
            state: TaskState::Waiting,
            progress: 0.0,
            error: None,
        }
    }

    fn transition(&mut self, next: TaskState) -> bool {
        if !self.state.can_become(next) {
            debug!("Ignoring {:?} -> {:?} for {}", self.state, next, self.spec.name);
            return false;
        }
        self.state = next;
        if next == TaskState::Finished {
            self.progress = 1.0;
        }
        true
    }
}

#[derive(Debug)]
struct ComboInner {
    state: TaskState,
    tasks: Vec<PipelineTask>,
}

/// The stages of one launch. Cloning shares the same task list.
#[derive(Debug, Clone)]
pub struct ComboTask {
    inner: Arc<Mutex<ComboInner>>,
}

impl ComboTask {
    pub fn new(specs: &[StageSpec]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ComboInner {
                state: TaskState::Waiting,
                tasks: specs.iter().copied().map(PipelineTask::new).collect(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ComboInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> TaskState {
        self.lock().state
    }

    pub fn tasks(&self) -> Vec<PipelineTask> {
        self.lock().tasks.clone()
    }

    pub fn task_state(&self, index: usize) -> Option<TaskState> {
        self.lock().tasks.get(index).map(|task| task.state)
    }

    /// Σ(weight × progress) / Σweight. Only a finished combo reports 1.0.
    pub fn progress(&self) -> f64 {
        let inner = self.lock();
        if inner.state == TaskState::Finished {
            return 1.0;
        }
        let total: u32 = inner.tasks.iter().map(|task| task.spec.weight).sum();
        if total == 0 {
            return 0.0;
        }
        let done: f64 = inner
            .tasks
            .iter()
            .map(|task| f64::from(task.spec.weight) * task.progress)
            .sum();
        (done / f64::from(total)).min(0.999)
    }

    pub fn set_state(&self, next: TaskState) -> bool {
        let mut inner = self.lock();
        if !inner.state.can_become(next) {
            return false;
        }
        inner.state = next;
        true
    }

    pub fn begin(&self, index: usize) -> bool {
        self.update(index, |task| task.transition(TaskState::Loading))
    }

    pub fn finish(&self, index: usize) -> bool {
        self.update(index, |task| task.transition(TaskState::Finished))
    }

    pub fn fail(&self, index: usize, error: &LauncherError) -> bool {
        self.update(index, |task| {
            let moved = task.transition(TaskState::Failed);
            if moved {
                task.error = Some(error.to_string());
            }
            moved
        })
    }

    pub fn abort_task(&self, index: usize) -> bool {
        self.update(index, |task| task.transition(TaskState::Aborted))
    }

    /// Record how a stage ended.
    pub fn settle<T>(&self, index: usize, result: &Result<T, LauncherError>) {
        match result {
            Ok(_) => {
                self.finish(index);
            }
            Err(e) if e.is_aborted() => {
                self.abort_task(index);
            }
            Err(e) => {
                self.fail(index, e);
            }
        }
    }

    /// Mark a stage done without running it.
    pub fn skip(&self, index: usize) {
        self.begin(index);
        self.finish(index);
    }

    /// Abort every stage that has not reached a terminal state.
    pub fn abort_unfinished(&self) {
        let mut inner = self.lock();
        for task in inner.tasks.iter_mut().filter(|task| !task.state.is_terminal()) {
            task.transition(TaskState::Aborted);
        }
    }

    /// Progress never moves backwards and stays inside [0, 1].
    pub fn report(&self, index: usize, progress: f64) {
        self.update(index, |task| {
            if task.state == TaskState::Loading {
                task.progress = task.progress.max(progress.clamp(0.0, 1.0));
            }
            true
        });
    }

    pub fn reporter(&self, index: usize) -> impl Fn(f64) + Send + Sync + 'static {
        let combo = self.clone();
        move |progress| combo.report(index, progress)
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut PipelineTask) -> bool) -> bool {
        let mut inner = self.lock();
        match inner.tasks.get_mut(index) {
            Some(task) => apply(task),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: [StageSpec; 2] = [
        StageSpec {
            name: "one",
            weight: 3,
            blocking: true,
            optional: false,
        },
        StageSpec {
            name: "two",
            weight: 1,
            blocking: true,
            optional: false,
        },
    ];

    #[test]
    fn states_never_re_enter() {
        use TaskState::*;
        assert!(Waiting.can_become(Loading));
        assert!(Waiting.can_become(Aborted));
        assert!(!Waiting.can_become(Finished));
        assert!(Loading.can_become(Failed));
        assert!(!Finished.can_become(Loading));
        assert!(!Failed.can_become(Aborted));
        assert!(!Loading.can_become(Loading));
    }

    #[test]
    fn progress_is_weighted_and_monotonic() {
        let combo = ComboTask::new(&SPECS);
        combo.set_state(TaskState::Loading);
        assert_eq!(combo.progress(), 0.0);

        combo.begin(0);
        combo.report(0, 0.5);
        assert!((combo.progress() - 0.375).abs() < 1e-9);

        combo.report(0, 0.2);
        assert!((combo.progress() - 0.375).abs() < 1e-9);

        combo.finish(0);
        combo.begin(1);
        combo.report(1, 7.0);
        combo.finish(1);
        assert!(combo.progress() < 1.0);

        combo.set_state(TaskState::Finished);
        assert_eq!(combo.progress(), 1.0);
    }

    #[test]
    fn progress_only_counts_while_loading() {
        let combo = ComboTask::new(&SPECS);
        combo.report(0, 0.9);
        assert_eq!(combo.tasks()[0].progress, 0.0);
    }

    #[test]
    fn settle_records_outcome() {
        let combo = ComboTask::new(&SPECS);
        combo.begin(0);
        combo.settle(0, &Err::<(), _>(LauncherError::user("boom")));
        combo.begin(1);
        combo.settle(1, &Err::<(), _>(LauncherError::Aborted));

        let tasks = combo.tasks();
        assert_eq!(tasks[0].state, TaskState::Failed);
        assert_eq!(tasks[0].error.as_deref(), Some("boom"));
        assert_eq!(tasks[1].state, TaskState::Aborted);

        assert!(!combo.finish(0));
    }

    #[test]
    fn abort_unfinished_leaves_terminal_tasks() {
        let combo = ComboTask::new(&SPECS);
        combo.skip(0);
        combo.abort_unfinished();
        assert_eq!(combo.task_state(0), Some(TaskState::Finished));
        assert_eq!(combo.task_state(1), Some(TaskState::Aborted));
    }
}
