//! Indiana Appearance form: static layout plus the collected answers.

use chrono::{Datelike, NaiveDate};

use super::writer::{Canvas, Font, PAGE_WIDTH};
use crate::error::RenderError;
use crate::form::FormData;
use crate::form::catalog::fields;

const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN * 2.0;
const BODY_SIZE: f32 = 11.0;
const CAPTION_SIZE: f32 = 12.0;
const CHECK_SIZE: f32 = 10.0;
const CHECKBOX: f32 = 10.0;
/// Left edge of the right-hand column (cause number, date).
const RIGHT_COLUMN: f32 = MARGIN + CONTENT_WIDTH - 150.0;
/// Single-line addresses longer than this are split at the first comma.
const ADDRESS_SPLIT_LEN: usize = 60;

const CAPTION_HEAD: &str = "IN THE ";
const CAPTION_BLANK: &str = "_________________";
const CAPTION_MID: &str = " COURT OF ";
const CAPTION_TAIL: &str = " COUNTY";
const PARTY_BLANK: &str = "____________________________________,";
const CAUSE_LABEL: &str = "Cause No. ";
const ADDRESS_LABEL: &str = "Address: ";
const PHONE_LABEL: &str = "Telephone: ";
const EMAIL_LABEL: &str = "Email: ";
const DATE_LABEL: &str = "Date: ";

/// Top of each row, in points from the top of the page. Labels and the
/// values written into their blanks share these.
mod row {
    pub const STATE: f32 = 72.0;
    pub const COURT: f32 = 92.0;
    pub const PARTIES_BOX: f32 = 132.0;
    pub const PLAINTIFF: f32 = 142.0;
    pub const PLAINTIFF_LABEL: f32 = 162.0;
    pub const VERSUS: f32 = 192.0;
    pub const DEFENDANT: f32 = 212.0;
    pub const DEFENDANT_LABEL: f32 = 232.0;
    pub const TITLE: f32 = 272.0;
    pub const BODY: f32 = 302.0;
    pub const ADDRESS: f32 = 362.0;
    pub const ADDRESS_CONT: f32 = 382.0;
    pub const PHONE: f32 = 412.0;
    pub const EMAIL: f32 = 442.0;
    pub const NOTIFY: f32 = 482.0;
    pub const SIGNATURE: f32 = 537.0;
    pub const PRINT_NAME: f32 = 582.0;
    /// Caption under a signature or print-name rule.
    pub const UNDER_RULE: f32 = 15.0;
}

/// Render the Appearance form filled with `data`, dated `date`.
pub fn render_appearance_form(data: &FormData, date: NaiveDate) -> Result<Vec<u8>, RenderError> {
    let mut canvas = Canvas::new();
    draw_layout(&mut canvas);
    fill(&mut canvas, data, date);
    canvas.into_pdf()
}

fn caption() -> String {
    format!("{CAPTION_HEAD}{CAPTION_BLANK}{CAPTION_MID}{CAPTION_BLANK}{CAPTION_TAIL}")
}

/// `label` followed by a rule running to `right`.
fn labelled_rule(label: &str, x: f32, right: f32) -> String {
    let rule_width = Font::Helvetica.text_width("_", BODY_SIZE);
    let room = right - x - Font::Helvetica.text_width(label, BODY_SIZE);
    let count = (room / rule_width).floor().max(0.0) as usize;
    format!("{label}{}", "_".repeat(count))
}

/// Where the blank after `label` starts when the label is drawn at `x`.
fn blank_start(label: &str, x: f32) -> f32 {
    x + Font::Helvetica.text_width(label, BODY_SIZE)
}

/// Start of the court and county blanks in the centered caption.
fn caption_blanks() -> (f32, f32) {
    let bold = |s: &str| Font::HelveticaBold.text_width(s, CAPTION_SIZE);
    let start = MARGIN + (CONTENT_WIDTH - bold(&caption())).max(0.0) / 2.0;
    let court = start + bold(CAPTION_HEAD);
    let county = court + bold(CAPTION_BLANK) + bold(CAPTION_MID);
    (court, county)
}

fn draw_layout(c: &mut Canvas) {
    use Font::{Helvetica, HelveticaBold};
    let right = MARGIN + CONTENT_WIDTH;

    // Caption
    c.text_centered(HelveticaBold, 14.0, MARGIN, CONTENT_WIDTH, row::STATE, "STATE OF INDIANA");
    c.text_centered(HelveticaBold, CAPTION_SIZE, MARGIN, CONTENT_WIDTH, row::COURT, &caption());

    c.stroke_rect(MARGIN, row::PARTIES_BOX, CONTENT_WIDTH, 100.0);
    let left = MARGIN + 10.0;
    c.text(Helvetica, BODY_SIZE, left, row::PLAINTIFF, PARTY_BLANK);
    c.text(Helvetica, BODY_SIZE, left, row::PLAINTIFF_LABEL, "Plaintiff,");
    c.text(Helvetica, BODY_SIZE, left, row::VERSUS, "v.");
    c.text(Helvetica, BODY_SIZE, left, row::DEFENDANT, PARTY_BLANK);
    c.text(Helvetica, BODY_SIZE, left, row::DEFENDANT_LABEL, "Defendant.");
    c.text(
        Helvetica,
        BODY_SIZE,
        RIGHT_COLUMN,
        row::PLAINTIFF_LABEL,
        &labelled_rule(CAUSE_LABEL, RIGHT_COLUMN, right - 10.0),
    );

    c.text_centered(HelveticaBold, 14.0, MARGIN, CONTENT_WIDTH, row::TITLE, "APPEARANCE");

    // Body
    for (i, line) in [
        "I hereby enter my appearance in the above-entitled cause and acknowledge",
        "service of process. I agree to accept service of pleadings and other papers",
        "by delivery to me or by leaving them at my address shown below.",
    ]
    .into_iter()
    .enumerate()
    {
        c.text(Helvetica, BODY_SIZE, MARGIN, row::BODY + 15.0 * i as f32, line);
    }

    c.text(Helvetica, BODY_SIZE, MARGIN, row::ADDRESS, &labelled_rule(ADDRESS_LABEL, MARGIN, right));
    c.text(Helvetica, BODY_SIZE, MARGIN, row::ADDRESS_CONT, &labelled_rule("", MARGIN, right));
    c.text(Helvetica, BODY_SIZE, MARGIN, row::PHONE, &labelled_rule(PHONE_LABEL, MARGIN, right));
    c.text(Helvetica, BODY_SIZE, MARGIN, row::EMAIL, &labelled_rule(EMAIL_LABEL, MARGIN, right));

    c.stroke_rect(MARGIN, row::NOTIFY, CHECKBOX, CHECKBOX);
    c.text(Helvetica, BODY_SIZE, MARGIN + 20.0, row::NOTIFY + 2.0, "I agree to notify the Court of any change in my address or");
    c.text(Helvetica, BODY_SIZE, MARGIN + 20.0, row::NOTIFY + 15.0, "telephone number.");

    // Signature block
    let signature_rule = labelled_rule("", MARGIN, RIGHT_COLUMN - 20.0);
    c.text(Helvetica, BODY_SIZE, MARGIN, row::SIGNATURE, &signature_rule);
    c.text(Helvetica, BODY_SIZE, MARGIN, row::SIGNATURE + row::UNDER_RULE, "Signature");
    c.text(Helvetica, BODY_SIZE, RIGHT_COLUMN, row::SIGNATURE, &labelled_rule(DATE_LABEL, RIGHT_COLUMN, right));
    c.text(Helvetica, BODY_SIZE, MARGIN, row::PRINT_NAME, &signature_rule);
    c.text(Helvetica, BODY_SIZE, MARGIN, row::PRINT_NAME + row::UNDER_RULE, "Print Name");
}

fn fill(c: &mut Canvas, data: &FormData, date: NaiveDate) {
    let font = Font::Helvetica;
    let right = MARGIN + CONTENT_WIDTH;
    let text = |field: &str| data.text(field).filter(|v| !v.is_empty());

    if let (Some(court), Some(county)) = (text(fields::COURT), text(fields::COUNTY)) {
        let (court_x, county_x) = caption_blanks();
        let blank = Font::HelveticaBold.text_width(CAPTION_BLANK, CAPTION_SIZE);
        c.text_box(Font::HelveticaBold, CAPTION_SIZE, court_x, row::COURT, blank, &court.to_uppercase());
        c.text_box(Font::HelveticaBold, CAPTION_SIZE, county_x, row::COURT, blank, &county.to_uppercase());
    }

    let party_width = font.text_width(PARTY_BLANK, BODY_SIZE);
    if let Some(plaintiff) = text(fields::PLAINTIFF) {
        c.text_box(font, BODY_SIZE, MARGIN + 10.0, row::PLAINTIFF, party_width, plaintiff);
    }
    if let Some(case_number) = text(fields::CASE_NUMBER) {
        let x = blank_start(CAUSE_LABEL, RIGHT_COLUMN);
        c.text_box(font, BODY_SIZE, x, row::PLAINTIFF_LABEL, right - x, case_number);
    }
    if let Some(defendant) = text(fields::DEFENDANT) {
        c.text_box(font, BODY_SIZE, MARGIN + 10.0, row::DEFENDANT, party_width, defendant);
    }

    if let Some(address) = text(fields::MAILING_ADDRESS) {
        let (first, second) = address_lines(address);
        let x = blank_start(ADDRESS_LABEL, MARGIN);
        c.text_box(font, BODY_SIZE, x, row::ADDRESS, right - x, &first);
        if let Some(second) = second {
            c.text_box(font, BODY_SIZE, MARGIN, row::ADDRESS_CONT, CONTENT_WIDTH, &second);
        }
    }

    if let Some(phone) = text(fields::PHONE) {
        let x = blank_start(PHONE_LABEL, MARGIN);
        c.text_box(font, BODY_SIZE, x, row::PHONE, right - x, phone);
    }
    if let Some(email) = text(fields::EMAIL) {
        let x = blank_start(EMAIL_LABEL, MARGIN);
        c.text_box(font, BODY_SIZE, x, row::EMAIL, right - x, email);
    }

    if data.flag(fields::AGREE_TO_NOTIFY) == Some(true) {
        c.text_centered(font, CHECK_SIZE, MARGIN, CHECKBOX, row::NOTIFY + 1.5, "X");
    }

    if let Some(defendant) = text(fields::DEFENDANT) {
        c.text_box(font, BODY_SIZE, MARGIN, row::PRINT_NAME, RIGHT_COLUMN - 20.0 - MARGIN, defendant);
    }
    let date_x = blank_start(DATE_LABEL, RIGHT_COLUMN);
    c.text_box(font, BODY_SIZE, date_x, row::SIGNATURE, right - date_x, &us_date(date));
}

/// Split a mailing address across the form's two address lines.
///
/// Multi-line input uses its first two lines. A long single line is split at
/// the first comma when there is one.
fn address_lines(address: &str) -> (String, Option<String>) {
    let lines: Vec<&str> = address.lines().collect();
    if lines.len() == 1 && address.chars().count() > ADDRESS_SPLIT_LEN {
        return match address.split_once(',') {
            Some((head, tail)) => (head.trim().to_string(), Some(tail.trim().to_string())),
            None => (address.to_string(), None),
        };
    }
    let first = lines.first().copied().unwrap_or(address).to_string();
    let second = lines
        .get(1)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string());
    (first, second)
}

/// `m/d/yyyy`, as US courts write dates.
fn us_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}
