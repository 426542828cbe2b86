//! Long-polling loop: updates in, replies out.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nasiya_engine::{Desk, TabularStore};
use nasiya_gateway::{GatewayError, Incoming, TelegramClient};

/// Concurrent handler threads; beyond this updates are handled on the
/// polling thread, which slows polling down.
pub const MAX_IN_FLIGHT: usize = 16;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

pub struct Runner<S> {
    desk: Arc<Desk<S>>,
    telegram: Arc<TelegramClient>,
    poll_timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a handler thread ends, even on panic.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S: TabularStore + 'static> Runner<S> {
    pub fn new(desk: Desk<S>, telegram: TelegramClient, poll_timeout: Duration) -> Self {
        Self {
            desk: Arc::new(desk),
            telegram: Arc::new(telegram),
            poll_timeout,
            max_in_flight: MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Poll until the transport refuses the bot token.
    pub fn run(&self) -> Result<(), GatewayError> {
        let mut offset = 0;
        let mut last_sweep = Instant::now();

        loop {
            match self.poll_once(offset) {
                Ok(next) => offset = next,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    log::warn!("polling failed: {}", e);
                    thread::sleep(POLL_ERROR_PAUSE);
                }
            }

            if last_sweep.elapsed() >= SWEEP_INTERVAL {
                let swept = self.desk.sweep_sessions();
                if swept > 0 {
                    log::debug!("dropped {} expired conversations", swept);
                }
                last_sweep = Instant::now();
            }
        }
    }

    /// One `getUpdates` round. Returns the offset for the next call.
    pub fn poll_once(&self, offset: i64) -> Result<i64, GatewayError> {
        let updates = self.telegram.get_updates(offset, self.poll_timeout)?;
        let mut next = offset;
        for update in updates {
            next = next.max(update.update_id + 1);
            match update.incoming() {
                Some(incoming) => self.dispatch(incoming),
                None => log::debug!("ignoring update {}", update.update_id),
            }
        }
        Ok(next)
    }

    fn dispatch(&self, incoming: Incoming) {
        if self.in_flight.load(Ordering::SeqCst) >= self.max_in_flight {
            deliver(&self.desk, &self.telegram, incoming);
            return;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));
        let desk = Arc::clone(&self.desk);
        let telegram = Arc::clone(&self.telegram);
        run_detached(
            Box::new(move || {
                let _guard = guard;
                deliver(&desk, &telegram, incoming);
            }),
            spawn_handler,
        );
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Hand `job` to `spawn`; if no thread can be started, run it here instead
/// so the update is still answered.
fn run_detached(job: Job, spawn: impl FnOnce(Job) -> io::Result<()>) {
    let slot = Arc::new(Mutex::new(Some(job)));
    let theirs = Arc::clone(&slot);
    let handoff: Job = Box::new(move || {
        let job = theirs.lock().ok().and_then(|mut job| job.take());
        if let Some(job) = job {
            job();
        }
    });

    if let Err(e) = spawn(handoff) {
        log::error!("cannot spawn handler thread, handling inline: {}", e);
        let job = slot.lock().ok().and_then(|mut job| job.take());
        if let Some(job) = job {
            job();
        }
    }
}

fn spawn_handler(job: Job) -> io::Result<()> {
    thread::Builder::new().name("nasiya-handler".into()).spawn(job).map(|_| ())
}

fn deliver<S: TabularStore>(desk: &Desk<S>, telegram: &TelegramClient, incoming: Incoming) {
    if let Some(id) = &incoming.callback_id {
        if let Err(e) = telegram.answer_callback_query(id) {
            log::warn!("answerCallbackQuery failed: {}", e);
        }
    }

    for reply in desk.handle(&incoming.event) {
        if let Err(e) = telegram.send_message(incoming.chat_id, &reply) {
            log::error!("reply to chat {} failed: {}", incoming.chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use nasiya_engine::access::AccessList;
    use nasiya_engine::layout::CellAddress;
    use nasiya_engine::record::Cell;
    use nasiya_engine::{DeskSettings, StoreError};
    use nasiya_gateway::{ApiClient, RetryPolicy};

    struct FixedStore(Vec<Vec<Cell>>);

    impl TabularStore for FixedStore {
        fn fetch_rows(&self) -> Result<Vec<Vec<Cell>>, StoreError> {
            Ok(self.0.clone())
        }

        fn append_row(&self, _row: u32, _cells: &[String]) -> Result<(), StoreError> {
            Ok(())
        }

        fn update_cell(&self, _address: &CellAddress, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn runner(server: &MockServer) -> Runner<FixedStore> {
        let rows = vec![
            vec![Cell::text("Ism"), Cell::text("Telefon")],
            vec![
                Cell::text("Sardor"),
                Cell::text("iPhone 14 Pro Max"),
                Cell::Number(500.0),
                Cell::Number(100.0),
                Cell::Number(400.0),
                Cell::Number(1200.0),
            ],
        ];
        let desk = Desk::new(FixedStore(rows), AccessList::parse("ali"), DeskSettings::default());
        let api = ApiClient::new(
            "Telegram",
            Duration::from_secs(5),
            RetryPolicy::immediate(0),
            TelegramClient::error_extractor(),
        )
        .unwrap();
        let telegram = TelegramClient::with_base_url(api, "1:T", &server.base_url());
        Runner::new(desk, telegram, Duration::from_secs(0)).with_max_in_flight(0)
    }

    fn message(update_id: i64, username: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "chat": {"id": 900},
                "from": {"id": 9, "first_name": "x", "username": username},
                "text": text
            }
        })
    }

    #[test]
    fn test_poll_once_replies_and_advances_offset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/getUpdates");
            then.status(200).json_body(serde_json::json!({
                "ok": true,
                "result": [message(41, "ali", "/start"), message(42, "ali", "/totals")]
            }));
        });
        let sent = server.mock(|when, then| {
            when.method(POST).path("/bot1:T/sendMessage");
            then.status(200).json_body(serde_json::json!({"ok": true, "result": {"message_id": 1}}));
        });

        let next = runner(&server).poll_once(41).unwrap();
        assert_eq!(next, 43);
        sent.assert_hits(2);
    }

    #[test]
    fn test_button_press_is_answered() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/getUpdates");
            then.status(200).json_body(serde_json::json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "callback_query": {
                        "id": "cb-7",
                        "from": {"id": 9, "first_name": "x", "username": "ali"},
                        "message": {"message_id": 3, "chat": {"id": 900}},
                        "data": "sel|Sardor|iPhone 14 Pro Max"
                    }
                }]
            }));
        });
        let answered = server.mock(|when, then| {
            when.method(POST)
                .path("/bot1:T/answerCallbackQuery")
                .json_body(serde_json::json!({"callback_query_id": "cb-7"}));
            then.status(200).json_body(serde_json::json!({"ok": true, "result": true}));
        });
        let sent = server.mock(|when, then| {
            when.method(POST).path("/bot1:T/sendMessage");
            then.status(200).json_body(serde_json::json!({"ok": true, "result": {"message_id": 1}}));
        });

        assert_eq!(runner(&server).poll_once(0).unwrap(), 8);
        answered.assert();
        sent.assert_hits(1);
    }

    #[test]
    fn test_failed_send_does_not_stop_polling() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/getUpdates");
            then.status(200)
                .json_body(serde_json::json!({"ok": true, "result": [message(5, "stranger", "/list")]}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/sendMessage");
            then.status(400)
                .json_body(serde_json::json!({"ok": false, "description": "Bad Request: chat not found"}));
        });

        assert_eq!(runner(&server).poll_once(0).unwrap(), 6);
    }

    #[test]
    fn test_empty_poll_keeps_offset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/getUpdates");
            then.status(200).json_body(serde_json::json!({"ok": true, "result": []}));
        });
        assert_eq!(runner(&server).poll_once(12).unwrap(), 12);
    }

    #[test]
    fn test_update_is_handled_inline_when_no_thread_starts() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        run_detached(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            |_| Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached")),
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_spawned_job_runs_once() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        run_detached(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            |job| {
                job();
                Ok(())
            },
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_revoked_token_surfaces_as_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot1:T/getUpdates");
            then.status(401)
                .json_body(serde_json::json!({"ok": false, "error_code": 401, "description": "Unauthorized"}));
        });
        assert!(runner(&server).run().unwrap_err().is_auth());
    }
}
