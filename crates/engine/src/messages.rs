//! Operator-facing texts. The operators work in Uzbek.

use chrono::{DateTime, Utc};

pub const HELP: &str = "👋 Xush kelibsiz!\n\
Quyidagi buyruqlardan foydalanishingiz mumkin:\n\
- /list   -- Shaxslar ro'yxatini ko'rish\n\
- /add    -- Yangi shaxs qo'shish\n\
- /edit   -- Mavjud shaxs ma'lumotlarini o'zgartirish\n\
- /totals -- Umumiy natijalarni ko'rish\n\
- /cancel -- Joriy amalni bekor qilish";

pub const DENIED: &str = "❌ You are not allowed to use this bot.";

pub const PICK_PERSON: &str = "Shaxsni tanlang:";
pub const PICK_PERSON_TO_EDIT: &str = "✏️ O'zgartirish uchun shaxsni tanlang:";
pub const PICK_YEAR: &str = "📅 Yilni tanlang:";
pub const PICK_MONTH: &str = "📅 Oyni tanlang:";
pub const EMPTY_LEDGER: &str = "📭 Ro'yxat bo'sh.";

pub const ASK_NAME: &str = "✏️ Ism kiriting:(Masalan, Abdusattor yoki Sardor)";
pub const ASK_PHONE: &str = "📱 Telefon kiriting: (Masalan, iPhone 16 Pro Max modelini yozing)";
pub const ASK_SUMMA: &str =
    "💰 Summani kiriting: (Bu yerga bergan summangizni $ belgisisiz, faqat raqam yozing)";
pub const ASK_NOMINAL: &str =
    "📊 Nominal summani kiriting: (Telefonning haqiqiy narxini $ belgisisiz, faqat raqam yozing)";

pub const EMPTY_INPUT: &str = "⚠️ Bo'sh qiymat. Qaytadan kiriting.";
pub const INVALID_AMOUNT: &str = "⚠️ Faqat raqam kiriting (masalan 500 yoki 1200,50).";
pub const USE_BUTTONS: &str = "👆 Iltimos, tugmalardan foydalaning.";
pub const SESSION_EXPIRED: &str = "⌛ Sessiya tugadi. /add yoki /edit bilan qaytadan boshlang.";
pub const UNKNOWN_COMMAND: &str = "🤷 Noma'lum buyruq. /start ni bosing.";
pub const CANCELLED: &str = "🚫 Bekor qilindi.";
pub const NOTHING_TO_CANCEL: &str = "Bekor qilinadigan amal yo'q.";
pub const NOT_FOUND: &str = "Not found.";
pub const INVALID_SELECTION: &str = "❌ Invalid selection";
pub const STALE_NOTE: &str = "⚠️ Jadval yangilanmadi, oxirgi saqlangan ma'lumot ko'rsatilmoqda.";

/// The stale note, with the time of the last good read when there was one.
pub fn stale_note(since: Option<DateTime<Utc>>) -> String {
    match since {
        Some(at) => format!("{STALE_NOTE} ({} UTC)", at.format("%Y-%m-%d %H:%M")),
        None => STALE_NOTE.to_string(),
    }
}

pub fn added(name: &str, phone: &str, summa: &str, nominal: &str) -> String {
    format!("✅ Qo'shildi: {name}, {phone}, {summa}, Nominal: {nominal}")
}

pub fn updated(year: i32, month: &str, name: &str, phone: &str, amount: &str) -> String {
    format!("✅ {year}-yil {month} oyi yangilandi — {name} ({phone}) = {amount}")
}

pub fn ask_edit_amount(month: &str, year: i32, name: &str, phone: &str) -> String {
    format!("💰 {name} ({phone}) uchun {year}-yil {month} summasini kiriting:")
}

pub fn save_failed(err: &dyn std::fmt::Display) -> String {
    format!("❌ Failed to save: {err}")
}

pub fn update_failed(err: &dyn std::fmt::Display) -> String {
    format!("❌ Failed to update: {err}")
}

pub fn unavailable(err: &dyn std::fmt::Display) -> String {
    format!("❌ Jadval bilan bog'lanib bo'lmadi: {err}")
}
