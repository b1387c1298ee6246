//! `calconduit publish-event` / `cancel-event` — submit one event with `delta=true`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use calconduit_core::{Settings, Webname};
use calconduit_sync::event::DEFAULT_TIMEZONE;
use calconduit_sync::{
    import_endpoint, submit_event, EventMethod, EventSubmission, HttpCalendarPublisher,
};

use super::home_dir;

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Destination webname on the calendar service.
    pub webname: String,

    /// Globally unique event id; a cancel must repeat the published UID.
    #[arg(long)]
    pub uid: String,

    /// Start, e.g. 20240115T153000 (local to --tzid) or 20240115T233000Z.
    #[arg(long)]
    pub dtstart: String,

    #[arg(long)]
    pub summary: String,

    #[arg(long)]
    pub dtend: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Extra VEVENT property (repeatable).
    #[arg(long = "property", value_name = "NAME=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// TZID attached to DTSTART and DTEND.
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    pub tzid: String,

    /// Write floating DTSTART/DTEND without a TZID.
    #[arg(long)]
    pub no_tzid: bool,

    /// Print the document and endpoint without publishing.
    #[arg(long)]
    pub dry_run: bool,
}

impl EventArgs {
    fn submission(&self) -> EventSubmission {
        let mut event = EventSubmission::new()
            .with("UID", &self.uid)
            .with("DTSTART", &self.dtstart);
        if let Some(dtend) = &self.dtend {
            event.set("DTEND", dtend);
        }
        event.set("SUMMARY", &self.summary);
        for (name, value) in [("LOCATION", &self.location), ("DESCRIPTION", &self.description)] {
            if let Some(value) = value {
                event.set(name, value);
            }
        }
        for (name, value) in &self.properties {
            event.set(name, value);
        }
        let timezone = (!self.no_tzid).then(|| self.tzid.clone());
        event.with_timezone(timezone)
    }
}

pub fn run(args: EventArgs, method: EventMethod) -> Result<()> {
    let home = home_dir()?;
    let webname = Webname::from(args.webname.as_str());
    if let Some(reason) = webname.validate() {
        bail!("invalid webname '{webname}': {reason}");
    }
    let event = args.submission();
    let payload = event.to_calendar(method).context("invalid event")?;
    let settings = Settings::load_at(&home).context("failed to load settings")?;

    if args.dry_run {
        println!(
            "[dry-run] would PUT {} bytes to {}",
            payload.len(),
            import_endpoint(&settings.service_base, &webname, true)
        );
        print!("{}", String::from_utf8_lossy(payload.as_bytes()));
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let publisher = HttpCalendarPublisher::new(
        settings.service_base.clone(),
        credentials,
        settings.publish_timeout(),
    );
    let outcome = submit_event(&publisher, &webname, &event, method)
        .with_context(|| format!("failed to submit event '{}'", args.uid))?;

    let summary = format!(
        "{method} '{}' → {webname}: HTTP {} {} {}: {}",
        args.uid, outcome.status, outcome.level, outcome.code, outcome.description
    );
    if !outcome.is_information() {
        println!("{} {summary}", "!".yellow().bold());
        bail!("calendar service answered with level '{}'", outcome.level);
    }
    println!("{} {summary}", "✓".green().bold());
    Ok(())
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> EventArgs {
        EventArgs {
            webname: "uw_colloquia".into(),
            uid: "colloq-1@example.edu".into(),
            dtstart: "20240115T153000".into(),
            summary: "Colloquium".into(),
            dtend: Some("20240115T163000".into()),
            location: None,
            description: Some("Talk".into()),
            properties: vec![("X-SPEAKER".into(), "A. Turing".into())],
            tzid: DEFAULT_TIMEZONE.into(),
            no_tzid: false,
            dry_run: true,
        }
    }

    #[test]
    fn property_flag_splits_on_first_equals() {
        assert_eq!(
            parse_property("URL=https://e.test/?a=b").unwrap(),
            ("URL".to_string(), "https://e.test/?a=b".to_string())
        );
        assert!(parse_property("=x").is_err());
        assert!(parse_property("NOVALUE").is_err());
    }

    #[test]
    fn submission_orders_core_fields_first() {
        let event = args().submission();
        assert_eq!(event.uid(), Some("colloq-1@example.edu"));
        assert_eq!(event.get("LOCATION"), None);
        let doc = String::from_utf8(
            event
                .to_calendar(EventMethod::Publish)
                .unwrap()
                .as_bytes()
                .to_vec(),
        )
        .unwrap();
        let dtend = doc.find("DTEND;TZID=").unwrap();
        let summary = doc.find("SUMMARY:").unwrap();
        let speaker = doc.find("X-SPEAKER:A. Turing").unwrap();
        assert!(dtend < summary && summary < speaker);
    }

    #[test]
    fn no_tzid_writes_floating_times() {
        let mut args = args();
        args.no_tzid = true;
        let payload = args.submission().to_calendar(EventMethod::Publish).unwrap();
        let doc = String::from_utf8_lossy(payload.as_bytes()).into_owned();
        assert!(doc.contains("\r\nDTSTART:20240115T153000\r\n"));
    }
}
