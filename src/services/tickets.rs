//! Ticket codes and the downloadable PDF ticket.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use sha2::{Digest, Sha256};

use crate::{
    error::{AppError, AppResult},
    models::{SeatCoordinate, TicketDetails},
};

const INSTRUCTIONS: [&str; 5] = [
    "Please arrive at the stadium at least 30 minutes before the match",
    "Carry a valid ID proof along with this ticket",
    "Outside food and beverages are not allowed",
    "Ticket is non-transferable and non-refundable",
    "Lost tickets will not be replaced",
];

/// Short verification code printed on the ticket and checked at the gate.
pub fn ticket_code(secret: &str, user_id: i64, match_id: i64, seat: SeatCoordinate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}:{}:{}", user_id, match_id, seat.row, seat.seat, secret).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_uppercase()
}

/// Label/value rows of the ticket table.
pub fn ticket_rows(ticket: &TicketDetails) -> Vec<(&'static str, String)> {
    vec![
        ("Match:", format!("{} vs {}", ticket.team1, ticket.team2)),
        ("Stadium:", format!("{}, {}", ticket.stadium_name, ticket.stadium_city)),
        ("Date & Time:", ticket.match_date.format("%B %d, %Y at %I:%M %p").to_string()),
        ("Seat:", format!("Row {}, Seat {}", ticket.seat_row, ticket.seat_number)),
        ("Category:", ticket.seat_category.clone()),
        ("Price:", format!("${:.2}", ticket.total_amount)),
        ("Booking ID:", format!("#{}", ticket.booking_id)),
        ("Booked By:", ticket.holder_name.clone()),
        ("Booking Date:", ticket.booking_date.format("%B %d, %Y").to_string()),
        ("Ticket Code:", ticket.qr_code.clone().unwrap_or_else(|| "-".to_string())),
    ]
}

pub fn attachment_filename(booking_id: i64) -> String {
    format!("ticket_{}.pdf", booking_id)
}

/// Renders a one-page US-letter ticket.
pub fn render_ticket_pdf(ticket: &TicketDetails) -> AppResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Ticket #{}", ticket.booking_id),
        Mm(215.9),
        Mm(279.4),
        "Ticket".to_string(),
    );
    let canvas = doc.get_page(page).get_layer(layer);

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    canvas.use_text("CRICKET TICKET", 24.0, Mm(70.0), Mm(250.0), &bold);

    let mut y = 225.0;
    for (label, value) in ticket_rows(ticket) {
        write_row(&canvas, &bold, &regular, label, &value, y);
        y -= 10.0;
    }

    y -= 10.0;
    canvas.use_text("Important Instructions:", 12.0, Mm(25.4), Mm(y), &bold);
    for line in INSTRUCTIONS {
        y -= 7.0;
        canvas.use_text(format!("- {}", line), 10.0, Mm(30.0), Mm(y), &regular);
    }
    canvas.use_text("Enjoy the match!", 12.0, Mm(25.4), Mm(y - 14.0), &bold);

    doc.save_to_bytes().map_err(pdf_error)
}

fn write_row(
    canvas: &PdfLayerReference,
    bold: &IndirectFontRef,
    regular: &IndirectFontRef,
    label: &str,
    value: &str,
    y: f32,
) {
    canvas.use_text(label, 12.0, Mm(25.4), Mm(y), bold);
    canvas.use_text(value, 12.0, Mm(76.2), Mm(y), regular);
}

fn pdf_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Internal(format!("failed to render ticket: {e}"))
}
