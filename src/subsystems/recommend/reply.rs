//! Outbound replies and their formatting.
//!
//! All text is Telegram HTML; every dynamic value goes through [`escape`].

use crate::lookup::metadata::known;
use crate::lookup::{MovieRecord, TrailerLink};

use super::parse::RecommendationEntry;

pub const WELCOME: &str = "🎬 Welcome to the Movie Bot! Send me a movie name to get recommendations.";

/// One outbound message, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// HTML-marked text.
    Text(String),
    /// Remote image with an optional HTML caption.
    Photo { url: String, caption: Option<String> },
}

/// A recommendation with whatever the lookups added to it.
#[derive(Debug, Clone)]
pub struct Enriched {
    pub entry: RecommendationEntry,
    pub record: Option<MovieRecord>,
    /// `None` when trailer lookups are not configured.
    pub trailer: Option<TrailerLink>,
}

impl Enriched {
    fn year(&self) -> Option<&str> {
        self.record.as_ref().and_then(|r| known(&r.year)).or(self.entry.year.as_deref())
    }

    fn rating(&self) -> Option<&str> {
        self.record.as_ref().and_then(|r| known(&r.rating)).or(self.entry.rating.as_deref())
    }

    fn genre(&self) -> Option<&str> {
        self.record.as_ref().and_then(|r| known(&r.genre)).or(self.entry.genre.as_deref())
    }

    /// The generator's reason, else the metadata plot.
    fn blurb(&self) -> Option<&str> {
        self.entry.reason.as_deref().or_else(|| self.record.as_ref().and_then(|r| known(&r.plot)))
    }

    pub fn poster_url(&self) -> Option<&str> {
        self.record.as_ref().and_then(MovieRecord::poster_url)
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn acknowledgment(query: &str) -> String {
    format!("🔎 Looking for movies like <b>{}</b>…", escape(query))
}

pub fn not_found(query: &str) -> String {
    format!("😕 I couldn't find <b>{}</b>. Try another title.", escape(query))
}

pub fn error(err: &dyn std::error::Error) -> String {
    format!("⚠️ Error fetching recommendation: {}", escape(&err.to_string()))
}

/// Single-recommendation message: the generator's answer under a header.
pub fn single_message(answer: &str) -> String {
    format!("🎬 <b>Movie Recommendation:</b>\n{}", escape(answer))
}

/// Combined list message: a header, then one numbered section per entry.
pub fn list_message(query: &str, items: &[Enriched]) -> String {
    let mut sections = vec![format!("🎬 <b>Movies like {}</b>", escape(query))];
    for (i, item) in items.iter().enumerate() {
        sections.push(entry_section(i + 1, item));
    }
    sections.join("\n\n")
}

fn entry_section(number: usize, item: &Enriched) -> String {
    let mut head = format!("{number}. <b>{}</b>", escape(&item.entry.title));
    if let Some(year) = item.year() {
        head.push_str(&format!(" ({})", escape(year)));
    }
    let mut lines = vec![head];

    let facts: Vec<String> = [item.rating().map(|r| format!("⭐ {}", escape(r))), item.genre().map(|g| format!("🎭 {}", escape(g)))]
        .into_iter()
        .flatten()
        .collect();
    if !facts.is_empty() {
        lines.push(facts.join(" · "));
    }
    if let Some(blurb) = item.blurb() {
        lines.push(format!("<i>{}</i>", escape(blurb)));
    }
    if let Some(trailer) = &item.trailer {
        lines.push(format!("🎞 Trailer: {}", escape(&trailer.to_string())));
    }
    lines.join("\n")
}

/// One photo per entry with a real poster, in entry order.
pub fn poster_replies(items: &[Enriched]) -> Vec<Reply> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            item.poster_url().map(|url| Reply::Photo {
                url: url.to_string(),
                caption: Some(format!("{}. <b>{}</b>", i + 1, escape(&item.entry.title))),
            })
        })
        .collect()
}

/// Card for a looked-up title, with the generator's suggestions appended.
pub fn lookup_card(record: &MovieRecord, trailer: Option<&TrailerLink>, similar: &str) -> String {
    let mut lines = vec![format!("🎬 <b>{}</b>", escape(&record.title))];
    for (label, value) in [("📅 Year", &record.year), ("⭐ Rating", &record.rating), ("🎭 Genre", &record.genre)] {
        lines.push(format!("{label}: {}", escape(value)));
    }
    lines.push(format!("📝 {}", escape(&record.plot)));
    if let Some(trailer) = trailer {
        lines.push(format!("🎞 Trailer: {}", escape(&trailer.to_string())));
    }
    format!("{}\n\n<b>You might also like:</b>\n{}", lines.join("\n"), escape(similar))
}

/// Strip tags and decode the entities [`escape`] produces, for plain-text sinks.
pub fn plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::PLACEHOLDER;

    fn entry(title: &str) -> RecommendationEntry {
        RecommendationEntry {
            title: title.into(),
            year: Some("1995".into()),
            genre: Some("Crime".into()),
            rating: Some("8.0".into()),
            reason: Some("Tight & tense".into()),
        }
    }

    fn record(poster: &str) -> MovieRecord {
        MovieRecord {
            title: "Heat".into(),
            year: "1995".into(),
            rating: "8.3".into(),
            genre: "Crime, Drama".into(),
            plot: "A heist.".into(),
            poster: poster.into(),
        }
    }

    #[test]
    fn escape_html_specials() {
        assert_eq!(escape("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;");
    }

    #[test]
    fn plain_text_round_trips_escaped_text() {
        let html = format!("<b>{}</b>", escape("Tom & <Jerry>"));
        assert_eq!(plain_text(&html), "Tom & <Jerry>");
    }

    #[test]
    fn list_prefers_metadata_values() {
        let items = vec![Enriched { entry: entry("Heat"), record: Some(record(PLACEHOLDER)), trailer: None }];
        let msg = list_message("Ronin", &items);
        assert!(msg.starts_with("🎬 <b>Movies like Ronin</b>\n\n1. <b>Heat</b> (1995)"));
        assert!(msg.contains("⭐ 8.3 · 🎭 Crime, Drama"));
        assert!(msg.contains("<i>Tight &amp; tense</i>"));
        assert!(!msg.contains("Trailer"));
    }

    #[test]
    fn list_falls_back_to_generator_values() {
        let mut rec = record(PLACEHOLDER);
        rec.rating = PLACEHOLDER.into();
        let items = vec![Enriched { entry: entry("Heat"), record: Some(rec), trailer: Some(TrailerLink::NotFound) }];
        let msg = list_message("Ronin", &items);
        assert!(msg.contains("⭐ 8.0"));
        assert!(msg.contains("🎞 Trailer: Trailer not found"));
    }

    #[test]
    fn list_uses_plot_when_no_reason() {
        let mut e = entry("Heat");
        e.reason = None;
        let items = vec![Enriched { entry: e, record: Some(record(PLACEHOLDER)), trailer: None }];
        assert!(list_message("x", &items).contains("<i>A heist.</i>"));
    }

    #[test]
    fn empty_list_is_header_only() {
        assert_eq!(list_message("x", &[]), "🎬 <b>Movies like x</b>");
    }

    #[test]
    fn posters_skip_placeholders_and_keep_numbering() {
        let items = vec![
            Enriched { entry: entry("A"), record: Some(record("https://img/a.jpg")), trailer: None },
            Enriched { entry: entry("B"), record: Some(record(PLACEHOLDER)), trailer: None },
            Enriched { entry: entry("C"), record: None, trailer: None },
            Enriched { entry: entry("D"), record: Some(record("https://img/d.jpg")), trailer: None },
        ];
        assert_eq!(
            poster_replies(&items),
            vec![
                Reply::Photo { url: "https://img/a.jpg".into(), caption: Some("1. <b>A</b>".into()) },
                Reply::Photo { url: "https://img/d.jpg".into(), caption: Some("4. <b>D</b>".into()) },
            ]
        );
    }

    #[test]
    fn lookup_card_lists_fields_and_suggestions() {
        let link = TrailerLink::Found("https://yt/watch?v=1".into());
        let card = lookup_card(&record(PLACEHOLDER), Some(&link), "Ronin - cars");
        assert!(card.starts_with("🎬 <b>Heat</b>\n📅 Year: 1995\n⭐ Rating: 8.3"));
        assert!(card.contains("🎞 Trailer: https://yt/watch?v=1"));
        assert!(card.ends_with("<b>You might also like:</b>\nRonin - cars"));
    }
}
