//! Organizer notification texts.

use guestlist_core::providers::Notification;
use guestlist_core::types::{Event, EventId, ResponseCounts, RsvpResponse};

/// A guest answered their invitation.
#[must_use]
pub fn rsvp_received(
    base_url: &str,
    event_id: EventId,
    event: Option<&Event>,
    guest_name: &str,
    response: RsvpResponse,
    counts: Option<ResponseCounts>,
) -> Notification {
    let verb = match response {
        RsvpResponse::Accepted => "accepted",
        RsvpResponse::Declined => "declined",
        RsvpResponse::Pending => "reset their answer",
    };
    let mut body = event.map_or_else(String::new, |e| format!("{}: ", e.title));
    match counts {
        Some(c) => body.push_str(&format!(
            "{} accepted, {} declined, {} pending",
            c.accepted, c.declined, c.pending
        )),
        None => body.push_str("response recorded"),
    }

    Notification {
        title: format!("{guest_name} {verb}"),
        body,
        url: format!("{base_url}/events/{event_id}/guests"),
        tag: format!("rsvp-{event_id}"),
    }
}

/// Someone was admitted at the door for the first time.
#[must_use]
pub fn guest_arrived(
    base_url: &str,
    event_id: EventId,
    event: Option<&Event>,
    name: &str,
    host: Option<&str>,
) -> Notification {
    let mut body = event.map_or_else(|| "Checked in".to_owned(), |e| format!("Checked in at {}", e.title));
    if let Some(host) = host {
        body.push_str(&format!(" (with {host})"));
    }

    Notification {
        title: format!("{name} has arrived"),
        body,
        url: format!("{base_url}/events/{event_id}/check-in"),
        tag: format!("check-in-{event_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsvp_text_carries_running_counts() {
        let event_id = EventId::new();
        let event = Event { id: event_id, title: "Sommerfest".into(), starts_at: None };
        let counts = ResponseCounts { accepted: 3, declined: 1, pending: 7 };

        let note = rsvp_received(
            "https://app.example.com",
            event_id,
            Some(&event),
            "Ada Lovelace",
            RsvpResponse::Accepted,
            Some(counts),
        );

        assert_eq!(note.title, "Ada Lovelace accepted");
        assert_eq!(note.body, "Sommerfest: 3 accepted, 1 declined, 7 pending");
        assert_eq!(note.url, format!("https://app.example.com/events/{event_id}/guests"));
        assert_eq!(note.tag, format!("rsvp-{event_id}"));
    }

    #[test]
    fn arrival_text_names_the_host_of_a_companion() {
        let event_id = EventId::new();
        let note = guest_arrived("", event_id, None, "Begleitung 1", Some("Grace Hopper"));
        assert_eq!(note.title, "Begleitung 1 has arrived");
        assert_eq!(note.body, "Checked in (with Grace Hopper)");
    }
}
