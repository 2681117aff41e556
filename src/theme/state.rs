//! Per-device appearance state with write-behind persistence.
//!
//! Mutations are applied to memory, local storage and the visual hook on the
//! caller's thread. Remote work (the initial fetch and every write) is queued
//! to a single worker thread, so remote writes reach the store in the order
//! the mutations happened and the last one wins. A fetch answered after a
//! newer local mutation only contributes the record id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use serde::Serialize;

use super::remote::SettingsRemote;
use super::storage::{LocalStorage, DARK_MODE_KEY, THEME_KEY};
use super::ThemeId;
use crate::models::settings::{Settings, SettingsPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Appearance {
    pub dark_mode: bool,
    pub theme: ThemeId,
    /// Id of the shared settings record, once known.
    pub settings_ref: Option<i64>,
}

/// Visual side effect run after every applied change (toggling the `dark`
/// class, setting `data-theme`, or in the CLI, printing).
pub type AppearanceHook = Arc<dyn Fn(&Appearance) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Change {
    DarkMode(bool),
    Theme(ThemeId),
}

impl Change {
    fn patch(self) -> SettingsPatch {
        match self {
            Change::DarkMode(dark) => SettingsPatch::dark_mode(dark),
            Change::Theme(theme) => SettingsPatch::theme(theme),
        }
    }
}

enum Job {
    /// Carries the mutation count seen when the fetch was queued.
    Fetch(u64),
    Write(Change),
    Flush(Sender<()>),
}

struct Shared {
    appearance: Mutex<Appearance>,
    storage: Arc<dyn LocalStorage>,
    remote: Arc<dyn SettingsRemote>,
    hook: Option<AppearanceHook>,
    mutations: AtomicU64,
}

impl Shared {
    fn snapshot(&self) -> Appearance {
        *self.appearance.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update<F: FnOnce(&mut Appearance)>(&self, f: F) -> Appearance {
        let mut guard = self.appearance.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
        *guard
    }

    /// Apply a local change and count it.
    fn mutate<F: FnOnce(&mut Appearance)>(&self, f: F) -> Appearance {
        self.update(|a| {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            f(a);
        })
    }

    fn notify(&self, appearance: &Appearance) {
        if let Some(ref hook) = self.hook {
            hook(appearance);
        }
    }

    fn store_local(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            log::warn!("[theme] Could not save {} locally: {}", key, e);
        }
    }

    fn apply_remote(&self, id: i64, settings: &Settings, seen: u64) {
        let mut superseded = false;
        let applied = self.update(|a| {
            a.settings_ref = Some(id);
            if self.mutations.load(Ordering::SeqCst) != seen {
                superseded = true;
                return;
            }
            a.dark_mode = settings.dark_mode;
            a.theme = settings.theme;
        });

        if superseded {
            log::debug!("[theme] Local change since fetch was queued, keeping local values");
        } else {
            self.notify(&applied);
        }
    }

    fn fetch(&self, seen: u64) {
        match self.remote.get_settings() {
            Ok(Some(settings)) => match settings.id {
                Some(id) => {
                    log::debug!(
                        "[theme] Remote settings {}: dark_mode={} theme={}",
                        id,
                        settings.dark_mode,
                        settings.theme
                    );
                    self.apply_remote(id, &settings, seen);
                }
                // Fallback answer from a store that couldn't be read
                None => log::warn!("[theme] Remote settings have no id, keeping local state"),
            },
            Ok(None) => log::debug!("[theme] No remote settings yet, keeping local state"),
            Err(e) => log::error!("[theme] Error fetching settings: {}", e),
        }
    }

    fn write(&self, change: Change) {
        let current = self.snapshot();
        match current.settings_ref {
            Some(id) => {
                if let Err(e) = self.remote.update_settings(id, &change.patch()) {
                    log::error!("[theme] Error saving settings {}: {}", id, e);
                }
            }
            None => {
                let patch = SettingsPatch::full(current.dark_mode, current.theme);
                match self.remote.create_settings(&patch) {
                    Ok(created) => {
                        if let Some(id) = created.id {
                            self.update(|a| a.settings_ref = Some(id));
                        }
                    }
                    Err(e) => log::error!("[theme] Error creating settings: {}", e),
                }
            }
        }
    }
}

fn run_worker(shared: Arc<Shared>, jobs: Receiver<Job>) {
    for job in jobs {
        match job {
            Job::Fetch(seen) => shared.fetch(seen),
            Job::Write(change) => shared.write(change),
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

pub struct ThemeState {
    shared: Arc<Shared>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl ThemeState {
    /// Starts at the defaults every page is first rendered with:
    /// light mode, modern theme, no record.
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        remote: Arc<dyn SettingsRemote>,
        hook: Option<AppearanceHook>,
    ) -> Self {
        let shared = Arc::new(Shared {
            appearance: Mutex::new(Appearance::default()),
            storage,
            remote,
            hook,
            mutations: AtomicU64::new(0),
        });

        let (tx, rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("theme-sync".to_string())
            .spawn(move || run_worker(worker_shared, rx));

        let (jobs, worker) = match worker {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                log::error!("[theme] Could not start sync worker, remote sync disabled: {}", e);
                (None, None)
            }
        };

        ThemeState {
            shared,
            jobs,
            worker,
        }
    }

    pub fn appearance(&self) -> Appearance {
        self.shared.snapshot()
    }

    pub fn dark_mode(&self) -> bool {
        self.appearance().dark_mode
    }

    pub fn theme(&self) -> ThemeId {
        self.appearance().theme
    }

    pub fn settings_ref(&self) -> Option<i64> {
        self.appearance().settings_ref
    }

    fn enqueue(&self, job: Job) {
        let Some(ref jobs) = self.jobs else {
            return;
        };
        if jobs.send(job).is_err() {
            log::error!("[theme] Sync worker has stopped, dropping remote job");
        }
    }

    fn enqueue_fetch(&self) {
        self.enqueue(Job::Fetch(self.shared.mutations.load(Ordering::SeqCst)));
    }

    /// Load the per-device preferences, then ask the remote store for the
    /// shared record in the background.
    pub fn hydrate(&self) {
        let saved_dark = self.shared.storage.get(DARK_MODE_KEY);
        let saved_theme = self.shared.storage.get(THEME_KEY);

        match (saved_dark.as_deref(), saved_theme.as_deref().and_then(ThemeId::from_id)) {
            (Some(dark), Some(theme)) => {
                let applied = self.shared.update(|a| {
                    a.dark_mode = dark == "true";
                    a.theme = theme;
                });
                self.shared.notify(&applied);
            }
            _ => log::debug!("[theme] No complete local preferences, keeping defaults"),
        }

        self.enqueue_fetch();
    }

    /// Flip dark mode. Returns the new value.
    pub fn toggle_dark_mode(&self) -> bool {
        let applied = self.shared.mutate(|a| a.dark_mode = !a.dark_mode);
        self.shared
            .store_local(DARK_MODE_KEY, if applied.dark_mode { "true" } else { "false" });
        self.shared.notify(&applied);
        self.enqueue(Job::Write(Change::DarkMode(applied.dark_mode)));
        applied.dark_mode
    }

    pub fn set_theme(&self, theme: ThemeId) {
        let applied = self.shared.mutate(|a| a.theme = theme);
        self.shared.store_local(THEME_KEY, theme.as_str());
        self.shared.notify(&applied);
        self.enqueue(Job::Write(Change::Theme(theme)));
    }

    /// Re-read the shared record, e.g. after another device changed it.
    pub fn refresh(&self) {
        self.enqueue_fetch();
    }

    /// Block until every job queued so far has run.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        self.enqueue(Job::Flush(tx));
        let _ = rx.recv();
    }
}

impl Drop for ThemeState {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what's left and exit
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[theme] Sync worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiteError;
    use crate::theme::storage::MemoryStorage;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Get,
        Create(SettingsPatch),
        Update(i64, SettingsPatch),
    }

    #[derive(Default)]
    struct FakeRemote {
        record: Mutex<Option<Settings>>,
        calls: Mutex<Vec<Call>>,
        fail: bool,
        /// When set, reads wait for a signal before answering.
        gate: Mutex<Option<Receiver<()>>>,
    }

    impl FakeRemote {
        fn with(record: Settings) -> Self {
            FakeRemote {
                record: Mutex::new(Some(record)),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            FakeRemote {
                fail: true,
                ..Default::default()
            }
        }

        fn gated(record: Settings) -> (Self, Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let remote = FakeRemote {
                record: Mutex::new(Some(record)),
                gate: Mutex::new(Some(rx)),
                ..Default::default()
            };
            (remote, tx)
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| *c != Call::Get)
                .collect()
        }
    }

    impl SettingsRemote for FakeRemote {
        fn get_settings(&self) -> Result<Option<Settings>, SiteError> {
            self.calls.lock().unwrap().push(Call::Get);
            if let Some(ref gate) = *self.gate.lock().unwrap() {
                let _ = gate.recv();
            }
            if self.fail {
                return Err(SiteError::FetchFailure("offline".into()));
            }
            Ok(*self.record.lock().unwrap())
        }

        fn create_settings(&self, patch: &SettingsPatch) -> Result<Settings, SiteError> {
            self.calls.lock().unwrap().push(Call::Create(*patch));
            if self.fail {
                return Err(SiteError::PersistenceFailure("offline".into()));
            }
            let created = Settings {
                id: Some(7),
                dark_mode: patch.dark_mode.unwrap_or(false),
                theme: patch.theme.unwrap_or_default(),
            };
            *self.record.lock().unwrap() = Some(created);
            Ok(created)
        }

        fn update_settings(&self, id: i64, patch: &SettingsPatch) -> Result<Settings, SiteError> {
            self.calls.lock().unwrap().push(Call::Update(id, *patch));
            if self.fail {
                return Err(SiteError::PersistenceFailure("offline".into()));
            }
            let mut record = self.record.lock().unwrap();
            let mut current = record.unwrap_or_default();
            current.id = Some(id);
            if let Some(dark) = patch.dark_mode {
                current.dark_mode = dark;
            }
            if let Some(theme) = patch.theme {
                current.theme = theme;
            }
            *record = Some(current);
            Ok(current)
        }
    }

    fn state_with(
        storage: &Arc<MemoryStorage>,
        remote: &Arc<FakeRemote>,
    ) -> ThemeState {
        ThemeState::new(storage.clone(), remote.clone(), None)
    }

    #[test]
    fn starts_at_defaults() {
        let state = state_with(&Arc::new(MemoryStorage::new()), &Arc::new(FakeRemote::default()));
        assert_eq!(
            state.appearance(),
            Appearance {
                dark_mode: false,
                theme: ThemeId::Modern,
                settings_ref: None,
            }
        );
    }

    #[test]
    fn toggle_without_record_creates_one() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(FakeRemote::default());
        let state = state_with(&storage, &remote);

        assert!(state.toggle_dark_mode());
        assert!(state.dark_mode());
        assert_eq!(storage.get(DARK_MODE_KEY).as_deref(), Some("true"));

        state.flush();
        assert_eq!(
            remote.writes(),
            vec![Call::Create(SettingsPatch::full(true, ThemeId::Modern))]
        );
        assert_eq!(state.settings_ref(), Some(7));
    }

    #[test]
    fn set_theme_with_record_sends_partial_update() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(FakeRemote::with(Settings {
            id: Some(3),
            dark_mode: false,
            theme: ThemeId::Modern,
        }));
        let state = state_with(&storage, &remote);
        state.hydrate();
        state.flush();
        assert_eq!(state.settings_ref(), Some(3));

        state.set_theme(ThemeId::Academic);
        assert_eq!(state.theme(), ThemeId::Academic);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("academic"));

        state.flush();
        assert_eq!(
            remote.writes(),
            vec![Call::Update(3, SettingsPatch::theme(ThemeId::Academic))]
        );
    }

    #[test]
    fn burst_before_create_returns_is_one_create_then_updates() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(FakeRemote::default());
        let state = state_with(&storage, &remote);

        state.toggle_dark_mode();
        state.set_theme(ThemeId::Minimal);
        state.toggle_dark_mode();
        state.flush();

        let writes = remote.writes();
        assert_eq!(writes.len(), 3);
        assert!(matches!(writes[0], Call::Create(_)));
        assert_eq!(writes[1], Call::Update(7, SettingsPatch::theme(ThemeId::Minimal)));
        assert_eq!(writes[2], Call::Update(7, SettingsPatch::dark_mode(false)));

        let stored = remote.record.lock().unwrap().unwrap();
        assert!(!stored.dark_mode);
        assert_eq!(stored.theme, ThemeId::Minimal);
    }

    #[test]
    fn preferences_survive_a_reload() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let state = state_with(&storage, &Arc::new(FakeRemote::failing()));
            state.toggle_dark_mode();
            state.set_theme(ThemeId::Aesthetic);
        }

        let reloaded = state_with(&storage, &Arc::new(FakeRemote::failing()));
        reloaded.hydrate();
        reloaded.flush();
        assert!(reloaded.dark_mode());
        assert_eq!(reloaded.theme(), ThemeId::Aesthetic);
    }

    #[test]
    fn remote_failures_keep_local_state() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(FakeRemote::failing());
        let state = state_with(&storage, &remote);

        state.set_theme(ThemeId::Professional);
        state.toggle_dark_mode();
        state.flush();

        assert_eq!(state.theme(), ThemeId::Professional);
        assert!(state.dark_mode());
        assert_eq!(state.settings_ref(), None);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("professional"));
    }

    #[test]
    fn remote_record_supersedes_local_preferences() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DARK_MODE_KEY, "false").unwrap();
        storage.set(THEME_KEY, "minimal").unwrap();
        let remote = Arc::new(FakeRemote::with(Settings {
            id: Some(1),
            dark_mode: true,
            theme: ThemeId::Academic,
        }));

        let state = state_with(&storage, &remote);
        state.hydrate();
        state.flush();
        assert_eq!(
            state.appearance(),
            Appearance {
                dark_mode: true,
                theme: ThemeId::Academic,
                settings_ref: Some(1),
            }
        );
    }

    #[test]
    fn invalid_local_theme_keeps_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DARK_MODE_KEY, "true").unwrap();
        storage.set(THEME_KEY, "neon").unwrap();

        let state = state_with(&storage, &Arc::new(FakeRemote::default()));
        state.hydrate();
        state.flush();
        assert!(!state.dark_mode());
        assert_eq!(state.theme(), ThemeId::Modern);
    }

    #[test]
    fn refresh_applies_changes_made_elsewhere() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(FakeRemote::with(Settings {
            id: Some(2),
            dark_mode: false,
            theme: ThemeId::Modern,
        }));
        let state = state_with(&storage, &remote);
        state.hydrate();
        state.flush();

        remote
            .update_settings(2, &SettingsPatch::full(true, ThemeId::Professional))
            .unwrap();
        state.refresh();
        state.flush();

        assert!(state.dark_mode());
        assert_eq!(state.theme(), ThemeId::Professional);
    }

    #[test]
    fn hook_sees_every_applied_change() {
        let seen: Arc<Mutex<Vec<Appearance>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: AppearanceHook = Arc::new(move |a: &Appearance| sink.lock().unwrap().push(*a));

        let state = ThemeState::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(FakeRemote::failing()),
            Some(hook),
        );
        state.toggle_dark_mode();
        state.set_theme(ThemeId::Minimal);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].dark_mode);
        assert_eq!(seen[1].theme, ThemeId::Minimal);
    }

    #[test]
    fn mutation_during_fetch_keeps_local_value() {
        let storage = Arc::new(MemoryStorage::new());
        let (remote, release) = FakeRemote::gated(Settings {
            id: Some(1),
            dark_mode: false,
            theme: ThemeId::Modern,
        });
        let remote = Arc::new(remote);
        let state = state_with(&storage, &remote);

        state.hydrate();
        assert!(state.toggle_dark_mode());
        release.send(()).unwrap();
        state.flush();

        assert_eq!(
            state.appearance(),
            Appearance {
                dark_mode: true,
                theme: ThemeId::Modern,
                settings_ref: Some(1),
            }
        );
        assert_eq!(storage.get(DARK_MODE_KEY).as_deref(), Some("true"));
        assert_eq!(remote.writes(), vec![Call::Update(1, SettingsPatch::dark_mode(true))]);
        assert!(remote.record.lock().unwrap().unwrap().dark_mode);
    }

    #[test]
    fn remote_answer_without_id_keeps_local_preferences() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DARK_MODE_KEY, "true").unwrap();
        storage.set(THEME_KEY, "aesthetic").unwrap();
        let remote = Arc::new(FakeRemote::with(Settings {
            id: None,
            dark_mode: false,
            theme: ThemeId::Modern,
        }));

        let state = state_with(&storage, &remote);
        state.hydrate();
        state.flush();
        assert_eq!(
            state.appearance(),
            Appearance {
                dark_mode: true,
                theme: ThemeId::Aesthetic,
                settings_ref: None,
            }
        );
    }
}
