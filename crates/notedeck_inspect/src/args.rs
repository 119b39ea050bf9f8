use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::request::{day_end, day_start, FetchRequest};

pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.primal.net",
    "wss://relay.nostr.band",
    "wss://nostr.wine",
];

pub const USAGE: &str = "\
usage: notedeck-inspect --pub <npub|hex> [options]

  --pub, --npub <key>     author to fetch notes for
  -r, --relay <url>       relay to query, repeatable (defaults to a public set)
  --since <YYYY-MM-DD>    only notes from this day on
  --until <YYYY-MM-DD>    only notes up to the end of this day
  --kind <n>              only notes of this kind
  --json                  print the report as json
  --timeout <secs>        per relay timeout (default 10)
  --kind-names <path>     json object of extra kind names, ie. {\"30023\": \"Article\"}
  --log-dir <path>        also write daily rotated logs here
  -h, --help              show this message
";

#[derive(Debug, Default)]
pub struct Args {
    pub author: Option<String>,
    pub relays: Vec<String>,
    pub since: Option<u64>,
    pub until: Option<u64>,
    pub kind: Option<u64>,
    pub json: bool,
    pub timeout: Option<Duration>,
    pub kind_names: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub help: bool,
    /// Flags that were recognized but had a missing or malformed value.
    /// Logging isn't up yet while parsing, so these are reported later.
    pub invalid: Vec<String>,
}

/// Either a plain date or unix seconds.
fn parse_day(value: &str, end_of_day: bool) -> Option<u64> {
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(if end_of_day {
        day_end(date)
    } else {
        day_start(date)
    })
}

impl Args {
    // parse arguments, return set of unrecognized args
    pub fn parse(args: &[String]) -> (Self, BTreeSet<String>) {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args::default();

        let mut i = 0;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            if arg == "-h" || arg == "--help" {
                res.help = true;
            } else if arg == "--json" {
                res.json = true;
            } else if arg == "--pub" || arg == "--npub" {
                i += 1;
                let Some(key) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                res.author = Some(key.clone());
            } else if arg == "-r" || arg == "--relay" {
                i += 1;
                let Some(relay) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                res.relays.push(relay.clone());
            } else if arg == "--since" || arg == "--until" {
                i += 1;
                let Some(value) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };

                let until = arg == "--until";
                match parse_day(value, until) {
                    Some(ts) if until => res.until = Some(ts),
                    Some(ts) => res.since = Some(ts),
                    None => res
                        .invalid
                        .push(format!("{arg} '{value}' is not a YYYY-MM-DD date")),
                }
            } else if arg == "--kind" {
                i += 1;
                let Some(value) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                match value.parse::<u64>() {
                    Ok(kind) => res.kind = Some(kind),
                    Err(_) => res.invalid.push(format!("--kind '{value}' is not a number")),
                }
            } else if arg == "--timeout" {
                i += 1;
                let Some(value) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => res.timeout = Some(Duration::from_secs(secs)),
                    _ => res
                        .invalid
                        .push(format!("--timeout '{value}' is not a positive number of seconds")),
                }
            } else if arg == "--kind-names" {
                i += 1;
                let Some(path) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                res.kind_names = Some(PathBuf::from(path));
            } else if arg == "--log-dir" {
                i += 1;
                let Some(path) = args.get(i) else {
                    res.invalid.push(format!("{arg} argument missing"));
                    continue;
                };
                res.log_dir = Some(PathBuf::from(path));
            } else {
                unrecognized_args.insert(arg.clone());
            }

            i += 1;
        }

        (res, unrecognized_args)
    }

    pub fn request(&self) -> FetchRequest {
        let relays = if self.relays.is_empty() {
            DEFAULT_RELAYS.iter().map(|r| (*r).to_owned()).collect()
        } else {
            self.relays.clone()
        };

        FetchRequest {
            author: self.author.clone().unwrap_or_default(),
            since: self.since,
            until: self.until,
            kind: self.kind,
            relays,
        }
    }
}
