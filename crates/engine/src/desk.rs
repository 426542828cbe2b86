//! The dispatcher: one inbound chat event in, a list of replies out.
//!
//! `Desk` owns everything the conversation needs (store, cache, sessions,
//! access list, layout) and is shared between worker threads behind an
//! `Arc`. Session transitions happen under the session lock; store calls
//! happen outside it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::access::AccessList;
use crate::cache::{RecordCache, RefreshError};
use crate::callback::Callback;
use crate::flow::{accept_amount, AddFlow, AddOutcome, AddStep, EditFlow, FlowError, NewRecord};
use crate::layout::{CellAddress, SheetLayout};
use crate::locator::{aggregate_totals, find_row};
use crate::messages;
use crate::record::Snapshot;
use crate::render::{self, Reply};
use crate::session::SessionStore;
use crate::store::TabularStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    /// Chat username without `@`, if the sender has one.
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    List,
    Add,
    Edit,
    Totals,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse `/name` or `/name@botname`, ignoring trailing arguments.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        Some(match name.as_str() {
            "start" | "help" => Command::Start,
            "list" => Command::List,
            "add" => Command::Add,
            "edit" => Command::Edit,
            "totals" => Command::Totals,
            "cancel" => Command::Cancel,
            _ => Command::Unknown(name),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Text(String),
    /// Callback data of a pressed inline button.
    Button(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub actor: Actor,
    pub input: Inbound,
}

impl InboundEvent {
    /// A typed message: a command if it starts with `/`, free text otherwise.
    pub fn message(actor: Actor, text: &str) -> Self {
        let input = match Command::parse(text) {
            Some(cmd) => Inbound::Command(cmd),
            None => Inbound::Text(text.to_string()),
        };
        Self { actor, input }
    }

    pub fn button(actor: Actor, data: &str) -> Self {
        Self { actor, input: Inbound::Button(data.to_string()) }
    }
}

#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub layout: SheetLayout,
    /// Spreadsheet function used in the Berdi formula (locale dependent).
    pub sum_function: String,
    pub session_ttl: Duration,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            sum_function: "СУММ".to_string(),
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}

pub struct Desk<S> {
    store: S,
    cache: RecordCache,
    adds: SessionStore<AddFlow>,
    edits: SessionStore<EditFlow>,
    access: AccessList,
    settings: DeskSettings,
    /// Held from reading the row count to the end of a write, so two
    /// appends never pick the same row.
    write_lock: Mutex<()>,
}

impl<S: TabularStore> Desk<S> {
    pub fn new(store: S, access: AccessList, settings: DeskSettings) -> Self {
        Self {
            store,
            cache: RecordCache::new(),
            adds: SessionStore::new(settings.session_ttl),
            edits: SessionStore::new(settings.session_ttl),
            access,
            settings,
            write_lock: Mutex::new(()),
        }
    }

    /// First load of the ledger. Startup treats a failure here as fatal.
    pub fn warm_up(&self) -> Result<Arc<Snapshot>, RefreshError> {
        self.cache.refresh(&self.store)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Drop expired conversations. Returns how many were removed.
    pub fn sweep_sessions(&self) -> usize {
        self.adds.sweep() + self.edits.sweep()
    }

    pub fn handle(&self, event: &InboundEvent) -> Vec<Reply> {
        if self.access.check(event.actor.handle.as_deref()).is_err() {
            return vec![Reply::text(messages::DENIED)];
        }
        let actor = event.actor.id;
        match &event.input {
            Inbound::Command(cmd) => self.on_command(actor, cmd),
            Inbound::Text(text) => self.on_text(actor, text),
            Inbound::Button(data) => self.on_button(actor, data),
        }
    }

    // -- commands -----------------------------------------------------------

    fn on_command(&self, actor: i64, cmd: &Command) -> Vec<Reply> {
        log::debug!("actor {} command {:?}", actor, cmd);
        match cmd {
            Command::Start => vec![Reply::text(messages::HELP)],
            Command::List => self.list(false),
            Command::Edit => {
                self.adds.remove(actor);
                self.list(true)
            }
            Command::Add => {
                self.edits.remove(actor);
                self.adds.put(actor, AddFlow::new());
                vec![Reply::text(messages::ASK_NAME)]
            }
            Command::Totals => match self.cache.refresh_or_stale(&self.store) {
                Ok((snapshot, stale)) => self.with_stale_note(
                    stale,
                    vec![Reply::html(render::totals(&aggregate_totals(&snapshot)))],
                ),
                Err(e) => vec![Reply::text(messages::unavailable(e.store_error()))],
            },
            Command::Cancel => {
                let had_add = self.adds.remove(actor).is_some();
                let had_edit = self.edits.remove(actor).is_some();
                if had_add || had_edit {
                    vec![Reply::text(messages::CANCELLED)]
                } else {
                    vec![Reply::text(messages::NOTHING_TO_CANCEL)]
                }
            }
            Command::Unknown(_) => vec![Reply::text(messages::UNKNOWN_COMMAND)],
        }
    }

    fn list(&self, edit: bool) -> Vec<Reply> {
        let (snapshot, stale) = match self.cache.refresh_or_stale(&self.store) {
            Ok(fresh) => fresh,
            Err(e) => return vec![Reply::text(messages::unavailable(e.store_error()))],
        };
        let keyboard = render::customer_keyboard(&snapshot, edit);
        let reply = if keyboard.is_empty() {
            Reply::text(messages::EMPTY_LEDGER)
        } else {
            let prompt = if edit { messages::PICK_PERSON_TO_EDIT } else { messages::PICK_PERSON };
            Reply::text(prompt).with_keyboard(keyboard)
        };
        self.with_stale_note(stale, vec![reply])
    }

    // -- free text ----------------------------------------------------------

    fn on_text(&self, actor: i64, text: &str) -> Vec<Reply> {
        if let Some(outcome) = self.adds.update(actor, |flow| flow.accept(text)) {
            return match outcome {
                AddOutcome::Next(step) => vec![Reply::text(prompt_for(step))],
                AddOutcome::Rejected(_, err) => vec![Reply::text(flow_error_text(&err))],
                AddOutcome::Complete(record) => {
                    self.adds.remove(actor);
                    self.save_new(record)
                }
            };
        }

        match self.edits.get(actor) {
            Some(edit) if edit.awaiting_amount() => self.save_edit(actor, edit, text),
            Some(_) => vec![Reply::text(messages::USE_BUTTONS)],
            None => Vec::new(),
        }
    }

    fn save_new(&self, record: NewRecord) -> Vec<Reply> {
        let _writing = self.write_lock.lock();
        let snapshot = match self.cache.refresh_or_stale(&self.store) {
            Ok((snapshot, _)) => snapshot,
            Err(e) => return vec![Reply::text(messages::save_failed(e.store_error()))],
        };
        // Index 0 is the header row even when the sheet is blank.
        let row = self.settings.layout.sheet_row(snapshot.len().max(1));
        let cells = record.to_row(row, &self.settings.layout, &self.settings.sum_function);

        if let Err(e) = self.store.append_row(row, &cells) {
            log::error!("failed to write new record {} at row {}: {}", record.identity(), row, e);
            return vec![Reply::text(messages::save_failed(&e))];
        }
        log::info!("added {} at row {}", record.identity(), row);

        let reply = Reply::text(messages::added(
            &record.name,
            &record.phone,
            &record.summa,
            &record.nominal,
        ));
        self.after_write(reply)
    }

    fn save_edit(&self, actor: i64, edit: EditFlow, text: &str) -> Vec<Reply> {
        let amount = match accept_amount(text) {
            Ok(amount) => amount,
            Err(err) => return vec![Reply::text(flow_error_text(&err))],
        };
        let EditFlow::MonthChosen { identity, year, month } = edit else {
            return vec![Reply::text(messages::USE_BUTTONS)];
        };
        self.edits.remove(actor);

        let _writing = self.write_lock.lock();
        let snapshot = match self.cache.refresh_or_stale(&self.store) {
            Ok((snapshot, _)) => snapshot,
            Err(e) => return vec![Reply::text(messages::update_failed(e.store_error()))],
        };
        let layout = &self.settings.layout;
        let row = match find_row(&snapshot, layout, &identity) {
            Ok(row) => row,
            Err(e) => {
                log::warn!("edit target vanished: {}", e);
                return vec![Reply::text(messages::NOT_FOUND)];
            }
        };
        let column = match layout.payment_column(year, month) {
            Ok(column) => column,
            Err(e) => return vec![Reply::text(messages::update_failed(&e))],
        };
        let address = CellAddress { column, row };

        if let Err(e) = self.store.update_cell(&address, &amount) {
            log::error!("failed to update {} for {}: {}", address, identity, e);
            return vec![Reply::text(messages::update_failed(&e))];
        }
        log::info!("updated {} {} {} for {}", address, year, month, identity);

        let reply = Reply::text(messages::updated(
            year,
            month.name(),
            &identity.name,
            &identity.phone,
            &amount,
        ));
        self.after_write(reply)
    }

    /// Re-read after a successful write. The write stands either way; a
    /// failed re-read only earns the reply a stale note.
    fn after_write(&self, reply: Reply) -> Vec<Reply> {
        let stale = match self.cache.refresh(&self.store) {
            Ok(_) => false,
            Err(e) => {
                log::warn!("write saved but ledger not re-read: {}", e);
                true
            }
        };
        self.with_stale_note(stale, vec![reply])
    }

    fn with_stale_note(&self, stale: bool, mut replies: Vec<Reply>) -> Vec<Reply> {
        if stale {
            let note = messages::stale_note(self.cache.last_refreshed());
            replies.insert(0, Reply::text(note));
        }
        replies
    }

    // -- buttons ------------------------------------------------------------

    fn on_button(&self, actor: i64, data: &str) -> Vec<Reply> {
        let Some(callback) = Callback::decode(data) else {
            log::debug!("unrecognised callback data {:?}", data);
            return vec![Reply::text(messages::INVALID_SELECTION)];
        };
        let layout = &self.settings.layout;

        match callback {
            Callback::Select(target) => {
                let snapshot = self.cache.read();
                let text = match target.resolve(&snapshot) {
                    Some(identity) => render::detail_for(&snapshot, layout, &identity),
                    None => messages::NOT_FOUND.to_string(),
                };
                self.with_stale_note(self.cache.is_stale(), vec![Reply::html(text)])
            }
            Callback::EditName(target) => {
                let snapshot = self.cache.read();
                let Some(identity) = target.resolve(&snapshot) else {
                    return vec![Reply::text(messages::NOT_FOUND)];
                };
                self.adds.remove(actor);
                self.edits.put(actor, EditFlow::start(identity));
                vec![Reply::text(messages::PICK_YEAR).with_keyboard(render::year_keyboard(layout))]
            }
            Callback::EditYear(year) => {
                match self.edits.update(actor, |flow| flow.choose_year(&year, layout)) {
                    None => vec![Reply::text(messages::SESSION_EXPIRED)],
                    Some(Err(e)) => {
                        log::debug!("rejected year button {:?}: {}", year, e);
                        vec![Reply::text(messages::INVALID_SELECTION)]
                    }
                    Some(Ok(_)) => {
                        vec![Reply::text(messages::PICK_MONTH).with_keyboard(render::month_keyboard())]
                    }
                }
            }
            Callback::EditMonth(month) => {
                let chosen = self.edits.update(actor, |flow| {
                    flow.choose_month(&month).map(|m| (m, flow.clone()))
                });
                match chosen {
                    None | Some(Err(FlowError::OutOfOrder)) => {
                        vec![Reply::text(messages::SESSION_EXPIRED)]
                    }
                    Some(Err(e)) => {
                        log::debug!("rejected month button {:?}: {}", month, e);
                        vec![Reply::text(messages::INVALID_SELECTION)]
                    }
                    Some(Ok((month, EditFlow::MonthChosen { identity, year, .. }))) => {
                        vec![Reply::text(messages::ask_edit_amount(
                            month.name(),
                            year,
                            &identity.name,
                            &identity.phone,
                        ))]
                    }
                    Some(Ok(_)) => vec![Reply::text(messages::SESSION_EXPIRED)],
                }
            }
        }
    }
}

fn prompt_for(step: AddStep) -> &'static str {
    match step {
        AddStep::AwaitingName => messages::ASK_NAME,
        AddStep::AwaitingPhone => messages::ASK_PHONE,
        AddStep::AwaitingSumma => messages::ASK_SUMMA,
        AddStep::AwaitingNominal => messages::ASK_NOMINAL,
    }
}

fn flow_error_text(err: &FlowError) -> &'static str {
    match err {
        FlowError::EmptyInput => messages::EMPTY_INPUT,
        FlowError::InvalidAmount(_) => messages::INVALID_AMOUNT,
        FlowError::OutOfOrder => messages::SESSION_EXPIRED,
        FlowError::Address(_) => messages::INVALID_SELECTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{MemoryStore, Write};
    use crate::render::ParseMode;

    const SARDOR: i64 = 1;

    fn ledger() -> MemoryStore {
        MemoryStore::with_rows(vec![
            vec!["Ism", "Telefon", "Summa", "Berdi", "Qoldiq", "Nominal"],
            vec!["Ali", "iPhone 13", "1000", "200", "800", "700"],
            vec!["Vali", "iPhone 14 Pro", "500", "550", "-50", "400"],
        ])
    }

    fn desk(store: MemoryStore) -> Desk<MemoryStore> {
        let desk = Desk::new(store, AccessList::parse("sardor"), DeskSettings::default());
        desk.warm_up().unwrap();
        desk
    }

    fn sardor() -> Actor {
        Actor { id: SARDOR, handle: Some("Sardor".into()) }
    }

    fn say(desk: &Desk<MemoryStore>, text: &str) -> Vec<Reply> {
        desk.handle(&InboundEvent::message(sardor(), text))
    }

    fn press(desk: &Desk<MemoryStore>, data: &str) -> Vec<Reply> {
        desk.handle(&InboundEvent::button(sardor(), data))
    }

    fn only_text(replies: &[Reply]) -> &str {
        assert_eq!(replies.len(), 1, "expected one reply, got {replies:?}");
        &replies[0].text
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/list"), Some(Command::List));
        assert_eq!(Command::parse("/Totals@nasiya_bot extra"), Some(Command::Totals));
        assert_eq!(Command::parse("/nope"), Some(Command::Unknown("nope".into())));
        assert_eq!(Command::parse("list"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_unauthorized_list_is_denied_without_touching_cache() {
        let store = ledger();
        let desk = Desk::new(store, AccessList::parse("sardor"), DeskSettings::default());
        let stranger = Actor { id: 99, handle: Some("mallory".into()) };
        let replies = desk.handle(&InboundEvent::message(stranger, "/list"));
        assert_eq!(replies, vec![Reply::text(messages::DENIED)]);
        assert_eq!(desk.store().fetch_count(), 0);
        assert!(!desk.cache().is_loaded());

        let anonymous = Actor { id: 100, handle: None };
        let replies = desk.handle(&InboundEvent::button(anonymous, "sel|Ali|iPhone 13"));
        assert_eq!(replies, vec![Reply::text(messages::DENIED)]);
    }

    #[test]
    fn test_add_flow_writes_row_with_formulas() {
        let desk = desk(ledger());
        assert_eq!(only_text(&say(&desk, "/add")), messages::ASK_NAME);
        assert_eq!(only_text(&say(&desk, "Sardor")), messages::ASK_PHONE);
        assert_eq!(only_text(&say(&desk, "iphone14promax")), messages::ASK_SUMMA);
        assert_eq!(only_text(&say(&desk, "500")), messages::ASK_NOMINAL);
        let done = say(&desk, "1200");
        assert_eq!(
            only_text(&done),
            "✅ Qo'shildi: Sardor, iPhone 14 Pro Max, 500, Nominal: 1200"
        );

        // three rows cached (header + 2), so the new record lands on sheet row 5
        assert_eq!(
            desk.store().writes(),
            vec![Write::Row {
                row: 5,
                cells: vec![
                    "Sardor".into(),
                    "iPhone 14 Pro Max".into(),
                    "500".into(),
                    "=СУММ(G5:AD5)".into(),
                    "=C5-D5".into(),
                    "1200".into(),
                ],
            }]
        );
        // session is gone: further text is ignored
        assert!(say(&desk, "hello").is_empty());
    }

    #[test]
    fn test_add_then_view_round_trip() {
        let desk = desk(ledger());
        for line in ["/add", "Sardor", "iphone14promax", "500", "1200"] {
            say(&desk, line);
        }
        let list = say(&desk, "/list");
        let keyboard = list[0].keyboard.clone().unwrap();
        let button = keyboard
            .iter()
            .flatten()
            .find(|b| b.label == "Sardor (iPhone 14 Pro Max)")
            .unwrap()
            .clone();

        let card = press(&desk, &button.data);
        assert_eq!(card[0].mode, ParseMode::Html);
        let text = only_text(&card);
        assert!(text.contains("📌 Name: Sardor\n"));
        assert!(text.contains("📱 Phone: iPhone 14 Pro Max\n"));
        assert!(text.contains("💰 Summa: $500,00\n"));
        assert!(text.contains("📊 Nominal Sum: $1200,00\n"));
    }

    #[test]
    fn test_add_rejects_bad_amount_and_keeps_step() {
        let desk = desk(ledger());
        for line in ["/add", "Ali", "iphone 13"] {
            say(&desk, line);
        }
        assert_eq!(only_text(&say(&desk, "besh yuz")), messages::INVALID_AMOUNT);
        assert_eq!(only_text(&say(&desk, "500")), messages::ASK_NOMINAL);
        assert!(desk.store().writes().is_empty());
    }

    #[test]
    fn test_add_write_failure_clears_session() {
        let desk = desk(ledger());
        for line in ["/add", "Ali", "iphone 13", "500"] {
            say(&desk, line);
        }
        desk.store().fail_writes(true);
        assert!(only_text(&say(&desk, "700")).starts_with("❌ Failed to save: "));
        assert!(say(&desk, "700").is_empty());
    }

    #[test]
    fn test_edit_flow_updates_single_cell() {
        let desk = desk(ledger());
        let list = say(&desk, "/edit");
        assert_eq!(list[0].text, messages::PICK_PERSON_TO_EDIT);

        assert_eq!(only_text(&press(&desk, "edn|ALI|iphone 13")), messages::PICK_YEAR);
        let months = press(&desk, "edy|2025");
        assert_eq!(months[0].keyboard.as_ref().map(|k| k.len()), Some(4));
        assert_eq!(
            only_text(&press(&desk, "edm|Mart")),
            "💰 ALI (iphone 13) uchun 2025-yil Mart summasini kiriting:"
        );
        assert_eq!(
            only_text(&say(&desk, "150")),
            "✅ 2025-yil Mart oyi yangilandi — ALI (iphone 13) = 150"
        );

        // Ali is cache index 1 → sheet row 3; 2025 Mart is column 9 (I)
        assert_eq!(
            desk.store().writes(),
            vec![Write::Cell { address: "I3".into(), value: "150".into() }]
        );
        assert!(say(&desk, "150").is_empty());
    }

    #[test]
    fn test_edit_second_year_column() {
        let desk = desk(ledger());
        press(&desk, "edn|Vali|iPhone 14 Pro");
        press(&desk, "edy|2026");
        press(&desk, "edm|Dekabr");
        say(&desk, "$75");
        assert_eq!(
            desk.store().writes(),
            vec![Write::Cell { address: "AD4".into(), value: "$75".into() }]
        );
    }

    #[test]
    fn test_out_of_order_buttons_report_expired_session() {
        let desk = desk(ledger());
        assert_eq!(only_text(&press(&desk, "edy|2025")), messages::SESSION_EXPIRED);
        assert_eq!(only_text(&press(&desk, "edm|Mart")), messages::SESSION_EXPIRED);

        press(&desk, "edn|Ali|iPhone 13");
        assert_eq!(only_text(&press(&desk, "edm|Mart")), messages::SESSION_EXPIRED);
        assert_eq!(only_text(&say(&desk, "150")), messages::USE_BUTTONS);
        assert_eq!(only_text(&press(&desk, "edy|1999")), messages::INVALID_SELECTION);
        assert!(desk.store().writes().is_empty());
    }

    #[test]
    fn test_edit_unknown_identity_is_not_found() {
        let desk = desk(ledger());
        press(&desk, "edn|Ghost|Nokia");
        press(&desk, "edy|2025");
        press(&desk, "edm|May");
        assert_eq!(only_text(&say(&desk, "10")), messages::NOT_FOUND);
        assert!(desk.store().writes().is_empty());
    }

    #[test]
    fn test_cancel_clears_both_flows() {
        let desk = desk(ledger());
        assert_eq!(only_text(&say(&desk, "/cancel")), messages::NOTHING_TO_CANCEL);
        say(&desk, "/add");
        assert_eq!(only_text(&say(&desk, "/cancel")), messages::CANCELLED);
        assert!(say(&desk, "Sardor").is_empty());
    }

    #[test]
    fn test_totals_and_stale_note() {
        let desk = desk(ledger());
        let replies = say(&desk, "/totals");
        assert_eq!(replies[0].mode, ParseMode::Html);
        assert!(only_text(&replies).contains("💰 Summa: $1500,00"));

        desk.store().fail_reads(true);
        let replies = say(&desk, "/totals");
        assert_eq!(replies.len(), 2);
        assert!(replies[0].text.starts_with(messages::STALE_NOTE));
        assert!(replies[0].text.ends_with(" UTC)"), "note should carry the last read time");
        assert!(replies[1].text.contains("💸 Qoldiq: $750,00"));
    }

    #[test]
    fn test_concurrent_adds_take_distinct_rows() {
        let store = ledger();
        store.slow_appends(Duration::from_millis(50));
        let desk = Arc::new(Desk::new(
            store,
            AccessList::parse("sardor, bobur"),
            DeskSettings::default(),
        ));
        desk.warm_up().unwrap();

        let actors = [
            (Actor { id: 1, handle: Some("sardor".into()) }, "Sardor", "700"),
            (Actor { id: 2, handle: Some("bobur".into()) }, "Bobur", "800"),
        ];
        for (actor, name, _) in &actors {
            for text in ["/add", *name, "iphone 13", "100"] {
                desk.handle(&InboundEvent::message(actor.clone(), text));
            }
        }

        let handles: Vec<_> = actors
            .into_iter()
            .map(|(actor, _, nominal)| {
                let desk = Arc::clone(&desk);
                std::thread::spawn(move || desk.handle(&InboundEvent::message(actor, nominal)))
            })
            .collect();
        for handle in handles {
            let replies = handle.join().unwrap();
            assert!(only_text(&replies).starts_with("✅"));
        }

        let mut rows: Vec<u32> = desk
            .store()
            .writes()
            .into_iter()
            .map(|w| match w {
                Write::Row { row, .. } => row,
                other => panic!("unexpected write {other:?}"),
            })
            .collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![5, 6]);

        let names: Vec<String> = desk.store().rows().iter().map(|r| r[0].to_string()).collect();
        assert!(names.contains(&"Sardor".to_string()));
        assert!(names.contains(&"Bobur".to_string()));
    }

    #[test]
    fn test_saved_add_notes_failed_reread() {
        let desk = desk(ledger());
        for text in ["/add", "Sardor", "iphone 13", "500"] {
            say(&desk, text);
        }
        desk.store().fail_reads(true);
        let replies = say(&desk, "1200");

        assert_eq!(replies.len(), 2);
        assert!(replies[0].text.starts_with(messages::STALE_NOTE));
        assert!(replies[1].text.starts_with("✅ Qo'shildi: Sardor"));
        assert_eq!(desk.store().writes().len(), 1);
        assert!(desk.cache().is_stale());
    }

    #[test]
    fn test_never_loaded_reports_error() {
        let store = ledger();
        store.fail_reads(true);
        let desk = Desk::new(store, AccessList::parse("sardor"), DeskSettings::default());
        assert!(desk.warm_up().is_err());
        assert!(only_text(&say(&desk, "/list")).starts_with("❌"));
    }

    #[test]
    fn test_select_by_row_index_and_unknown_payload() {
        let desk = desk(ledger());
        let card = press(&desk, "sel#2");
        assert!(only_text(&card).contains("📌 Name: Vali\n"));
        assert_eq!(only_text(&press(&desk, "sel#0")), messages::NOT_FOUND);
        assert_eq!(only_text(&press(&desk, "garbage")), messages::INVALID_SELECTION);
    }

    #[test]
    fn test_unknown_command_and_help() {
        let desk = desk(ledger());
        assert_eq!(only_text(&say(&desk, "/frobnicate")), messages::UNKNOWN_COMMAND);
        assert!(only_text(&say(&desk, "/start@nasiya_bot")).contains("/totals"));
    }
}
