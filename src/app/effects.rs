use crate::app::{App, Message, Model, ToastLevel};
use crate::preload::ThreadedLoader;
use crate::watcher::{DEFAULT_DEBOUNCE, ManifestWatcher};

impl App {
    pub(super) fn make_manifest_watcher(model: &Model) -> notify::Result<ManifestWatcher> {
        ManifestWatcher::new(&model.manifest_path, DEFAULT_DEBOUNCE)
    }

    pub(super) fn handle_message_side_effects(model: &mut Model, msg: &Message) {
        if matches!(msg, Message::ManifestChanged) {
            match model.reload_from_disk() {
                Ok(()) => model.show_toast(ToastLevel::Info, "Manifest reloaded"),
                Err(err) => {
                    model.show_toast(ToastLevel::Error, format!("Reload failed: {err}"));
                    crate::perf::log_event(
                        "reload.error",
                        format!("path={} err={err}", model.manifest_path.display()),
                    );
                }
            }
        }
    }

    /// Hand queued loads to the worker pool.
    pub(super) fn dispatch_loads(model: &mut Model, loader: &ThreadedLoader) -> usize {
        let requests = model.take_pending_loads();
        let count = requests.len();
        for request in requests {
            loader.dispatch(request);
        }
        count
    }

    /// Feed finished loads back into the model. Returns how many arrived.
    pub(super) fn collect_loads(model: &mut Model, loader: &ThreadedLoader) -> usize {
        let completions = loader.poll();
        let count = completions.len();
        for completion in completions {
            crate::perf::log_event(
                "loader.complete",
                format!("src={} ok={}", completion.src, completion.result.is_ok()),
            );
            model.finish_load(completion);
        }
        count
    }
}
