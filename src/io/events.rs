use anyhow::{anyhow, Result};
use std::io::BufRead;

use crate::model::Event;

/// One read's worth of detected events.
#[derive(Debug, Clone)]
pub struct EventRead {
    pub id: String,
    pub events: Vec<Event>,
}

/// Streaming reader for whitespace-separated event tables:
/// `read_id  mean  stdv  start  length`, one event per line, events of
/// one read on consecutive lines. Lines starting with '#' are skipped.
pub struct EventReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    pending: Option<(String, Event)>,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false, pending: None }
    }

    pub fn next_read(&mut self) -> Result<Option<EventRead>> {
        if self.done && self.pending.is_none() {
            return Ok(None);
        }

        let (id, first) = match self.pending.take() {
            Some(p) => p,
            None => match self.next_data_line()? {
                Some(p) => p,
                None => return Ok(None),
            },
        };

        let mut events = vec![first];
        while let Some((next_id, ev)) = self.next_data_line()? {
            if next_id == id {
                events.push(ev);
            } else {
                self.pending = Some((next_id, ev));
                break;
            }
        }
        Ok(Some(EventRead { id, events }))
    }

    fn next_data_line(&mut self) -> Result<Option<(String, Event)>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                return Ok(None);
            }
            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return parse_event_line(line).map(Some);
        }
    }
}

fn parse_event_line(line: &str) -> Result<(String, Event)> {
    let mut it = line.split_whitespace();
    let id = it
        .next()
        .ok_or_else(|| anyhow!("empty event line"))?
        .to_string();
    let mean: f32 = next_field(&mut it, line, "mean")?;
    let stdv: f32 = next_field(&mut it, line, "stdv")?;
    let start: u32 = next_field(&mut it, line, "start")?;
    let length: u32 = next_field(&mut it, line, "length")?;
    Ok((id, Event { mean, stdv, start, length }))
}

fn next_field<'a, T: std::str::FromStr>(
    it: &mut impl Iterator<Item = &'a str>,
    line: &str,
    name: &str,
) -> Result<T> {
    it.next()
        .ok_or_else(|| anyhow!("event line missing {} field: '{}'", name, line))?
        .parse()
        .map_err(|_| anyhow!("cannot parse {} in event line: '{}'", name, line))
}
