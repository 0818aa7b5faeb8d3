// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for `.rtlog` files.
//!
//! Each line has the form `Kind -> key: value key: value ...`. Values are numbers, booleans,
//! quoted strings, bracketed lists or bare words such as `nil`. Lines without ` -> ` are skipped.

use crate::{
    errors::{LogParseError, LogParseErrorKind, RtlogError},
    events::EventKind,
    model::{BusDecl, ConjectureViolation, CpuDecl, CpuWithEvents, ExecutionEvent, LogData},
};
use camino::Utf8Path;
use smol_str::SmolStr;
use tracing::debug;

/// Reads and parses a real-time log file.
pub fn read_log(path: &Utf8Path) -> Result<LogData, RtlogError> {
    let contents = std::fs::read_to_string(path).map_err(|error| RtlogError::Read {
        path: path.to_owned(),
        error,
    })?;
    parse_log(&contents).map_err(|error| RtlogError::Parse {
        path: path.to_owned(),
        error,
    })
}

/// Reads a JSON array of conjecture violations.
pub fn read_conjectures(path: &Utf8Path) -> Result<Vec<ConjectureViolation>, RtlogError> {
    let contents = std::fs::read_to_string(path).map_err(|error| RtlogError::Read {
        path: path.to_owned(),
        error,
    })?;
    serde_json::from_str(&contents).map_err(|error| RtlogError::Conjectures {
        path: path.to_owned(),
        error,
    })
}

/// Parses the contents of a real-time log.
pub fn parse_log(contents: &str) -> Result<LogData, LogParseError> {
    let mut builder = LogDataBuilder::default();
    for (index, line) in contents.lines().enumerate() {
        let Some((kind, fields)) = line.split_once(" -> ") else {
            continue;
        };
        // Interpreters log more kinds than the diagrams show, such as `InstVarChange`.
        let Ok(kind) = kind.trim().parse::<EventKind>() else {
            debug!("line {}: skipping unknown event kind `{}`", index + 1, kind.trim());
            continue;
        };
        let event = parse_event(kind, fields)
            .map_err(|kind| LogParseError::new(index + 1, kind))?;
        builder.add(event);
    }
    Ok(builder.finish())
}

#[derive(Clone, Debug, PartialEq)]
enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(SmolStr),
    List(Vec<Value>),
}

impl Value {
    fn parse_bare(token: &str) -> Self {
        if let Ok(n) = token.parse::<i64>() {
            return Value::Integer(n);
        }
        if let Ok(n) = token.parse::<f64>()
            && n.is_finite()
        {
            return Value::Float(n);
        }
        if token.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        let list = token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .or_else(|| token.strip_prefix('{').and_then(|t| t.strip_suffix('}')));
        if let Some(list) = list {
            return Value::List(
                list.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(Value::parse_bare)
                    .collect(),
            );
        }
        Value::Str(token.into())
    }

    fn is_nil(&self) -> bool {
        matches!(self, Value::Str(s) if s == "nil")
    }

    fn to_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(n) => u64::try_from(*n).ok(),
            Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64 => {
                Some(*f as u64)
            }
            _ => None,
        }
    }

    fn display(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.to_string(),
            Value::List(items) => {
                let items: Vec<_> = items.iter().map(Value::display).collect();
                format!("[{}]", items.join(","))
            }
        }
    }
}

enum Token<'a> {
    Bare(&'a str),
    Quoted(&'a str),
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LogParseErrorKind> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or(LogParseErrorKind::UnterminatedString)?;
            tokens.push(Token::Quoted(&quoted[..end]));
            rest = &quoted[end + 1..];
        } else {
            // Bracketed lists may contain spaces.
            let close = match rest.as_bytes()[0] {
                b'[' => Some(']'),
                b'{' => Some('}'),
                _ => None,
            };
            let end = match close.and_then(|c| rest.find(c)) {
                Some(end) => end + 1,
                None => rest.find(char::is_whitespace).unwrap_or(rest.len()),
            };
            tokens.push(Token::Bare(&rest[..end]));
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }
    Ok(tokens)
}

struct Fields {
    kind: EventKind,
    values: Vec<(SmolStr, Value)>,
}

impl Fields {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .filter(|v| !v.is_nil())
    }

    fn u64(&self, key: &'static str) -> Result<Option<u64>, LogParseErrorKind> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => {
                value
                    .to_u64()
                    .map(Some)
                    .ok_or_else(|| LogParseErrorKind::InvalidValue {
                        field: key.to_owned(),
                        value: value.display(),
                    })
            }
        }
    }

    fn string(&self, key: &str) -> Option<SmolStr> {
        self.get(key).map(|value| match value {
            Value::Str(s) => s.clone(),
            other => other.display().into(),
        })
    }

    fn bool(&self, key: &'static str) -> Result<Option<bool>, LogParseErrorKind> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(value) => Err(LogParseErrorKind::InvalidValue {
                field: key.to_owned(),
                value: value.display(),
            }),
        }
    }
}

fn parse_event(kind: EventKind, input: &str) -> Result<ExecutionEvent, LogParseErrorKind> {
    let mut values = Vec::new();
    let mut tokens = tokenize(input)?.into_iter();
    while let Some(token) = tokens.next() {
        let key = match token {
            Token::Bare(key) => key
                .strip_suffix(':')
                .ok_or_else(|| LogParseErrorKind::MalformedKey(key.to_owned()))?,
            Token::Quoted(key) => return Err(LogParseErrorKind::MalformedKey(format!("\"{key}\""))),
        };
        let value = match tokens.next() {
            Some(Token::Bare(value)) => Value::parse_bare(value),
            Some(Token::Quoted(value)) => Value::Str(value.into()),
            None => return Err(LogParseErrorKind::MissingValue(key.to_owned())),
        };
        values.push((key.into(), value));
    }
    let fields = Fields { kind, values };

    let time = match fields.u64("time")? {
        Some(time) => time,
        None if kind.is_declaration() => 0,
        None => {
            return Err(LogParseErrorKind::MissingField {
                kind: fields.kind.to_string(),
                field: "time",
            });
        }
    };

    Ok(ExecutionEvent {
        kind,
        time,
        id: fields.u64("id")?,
        cpunm: fields.u64("cpunm")?,
        objref: fields.u64("objref")?,
        clnm: fields.string("clnm").or_else(|| {
            // Declarations carry their display name in `name`.
            kind.is_declaration()
                .then(|| fields.string("name"))
                .flatten()
        }),
        opname: fields.string("opname"),
        is_async: fields.bool("async")?,
        busid: fields.u64("busid")?,
        fromcpu: fields.u64("fromcpu")?,
        tocpu: fields.u64("tocpu")?,
        msgid: fields.u64("msgid")?,
        callthr: fields.u64("callthr")?,
    })
}

#[derive(Default)]
struct LogDataBuilder {
    execution_events: Vec<ExecutionEvent>,
    cpus: Vec<CpuWithEvents>,
    deployments: Vec<(u64, ExecutionEvent)>,
    declared_cpus: Vec<(u64, SmolStr)>,
    declared_buses: Vec<(u64, SmolStr)>,
    // Message and reply requests that have not completed yet.
    pending_messages: Vec<ExecutionEvent>,
    bus_topologies: Vec<(u64, Vec<u64>)>,
    timestamps: Vec<u64>,
}

impl LogDataBuilder {
    fn add(&mut self, mut event: ExecutionEvent) {
        if self.timestamps.last().is_none_or(|&last| event.time > last) {
            self.timestamps.push(event.time);
        }

        match event.kind {
            EventKind::CpuDecl | EventKind::BusDecl => {
                let (Some(id), Some(name)) = (event.id, event.clnm.clone()) else {
                    debug!("ignoring {} without id or name", event.kind);
                    return;
                };
                if event.kind == EventKind::CpuDecl {
                    self.declared_cpus.push((id, name));
                } else {
                    self.declared_buses.push((id, name));
                }
                return;
            }
            EventKind::DeployObj => {
                let cpu = event.cpunm.unwrap_or(0);
                self.deployments.push((cpu, event));
                return;
            }
            _ => {}
        }

        if matches!(
            event.kind,
            EventKind::MessageRequest | EventKind::ReplyRequest
        ) {
            self.add_to_topology(&event);
        }

        if event.kind != EventKind::MessageActivate {
            if event.kind == EventKind::MessageCompleted {
                self.complete_message(&mut event);
            }

            let cpu_id = event
                .cpunm
                .or(event.fromcpu)
                .or(event.tocpu)
                .or(event.id)
                .unwrap_or(0);
            let cpu = match self.cpus.iter().position(|cpu| cpu.id == cpu_id) {
                Some(index) => &mut self.cpus[index],
                None => {
                    self.cpus.push(CpuWithEvents {
                        id: cpu_id,
                        name: SmolStr::default(),
                        execution_events: Vec::new(),
                        deploy_events: Vec::new(),
                        timestamps: Vec::new(),
                    });
                    let last = self.cpus.len() - 1;
                    &mut self.cpus[last]
                }
            };
            if cpu.timestamps.last().is_none_or(|&last| event.time > last) {
                cpu.timestamps.push(event.time);
            }
            cpu.execution_events.push(event.clone());

            if matches!(
                event.kind,
                EventKind::MessageRequest | EventKind::ReplyRequest
            ) {
                self.pending_messages.push(event.clone());
            }
        }

        self.execution_events.push(event);
    }

    // A completed message inherits its route from the request that started it.
    fn complete_message(&mut self, event: &mut ExecutionEvent) {
        let Some(index) = self
            .pending_messages
            .iter()
            .position(|m| m.msgid.is_some() && m.msgid == event.msgid)
        else {
            debug!(
                "message {:?} completed at {} without a request",
                event.msgid, event.time
            );
            return;
        };
        let request = self.pending_messages.remove(index);
        event.busid = request.busid;
        event.callthr = request.callthr;
        event.tocpu = request.tocpu;
        if request.kind == EventKind::MessageRequest {
            event.opname = request.opname;
            event.objref = request.objref;
            event.clnm = request.clnm;
        }
    }

    fn add_to_topology(&mut self, event: &ExecutionEvent) {
        let Some(busid) = event.busid else {
            return;
        };
        match self.bus_topologies.iter_mut().find(|(id, _)| *id == busid) {
            Some((_, topology)) => {
                if let Some(to) = event.tocpu
                    && !topology.contains(&to)
                {
                    topology.push(to);
                }
            }
            None => {
                let mut topology: Vec<u64> = event.fromcpu.into_iter().collect();
                if let Some(to) = event.tocpu
                    && !topology.contains(&to)
                {
                    topology.push(to);
                }
                self.bus_topologies.push((busid, topology));
            }
        }
    }

    fn finish(mut self) -> LogData {
        self.cpus.sort_by_key(|cpu| cpu.id);
        for cpu in &mut self.cpus {
            cpu.name = self
                .declared_cpus
                .iter()
                .find(|(id, _)| *id == cpu.id)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| default_name("vCPU", "CPU", cpu.id));
            cpu.deploy_events = self
                .deployments
                .iter()
                .filter(|(id, _)| *id == cpu.id)
                .map(|(_, event)| event.clone())
                .collect();
        }
        let cpu_decls = self
            .cpus
            .iter()
            .map(|cpu| CpuDecl {
                id: cpu.id,
                name: cpu.name.clone(),
            })
            .collect();

        let mut bus_decls: Vec<_> = self
            .bus_topologies
            .into_iter()
            .map(|(id, topology)| BusDecl {
                id,
                name: self
                    .declared_buses
                    .iter()
                    .find(|(bus, _)| *bus == id)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_else(|| default_name("vBUS", "BUS", id)),
                topology,
            })
            .collect();
        bus_decls.sort_by_key(|bus| bus.id);

        LogData {
            cpu_decls,
            bus_decls,
            execution_events: self.execution_events,
            cpus_with_events: self.cpus,
            timestamps: self.timestamps,
        }
    }
}

fn default_name(virtual_name: &str, prefix: &str, id: u64) -> SmolStr {
    if id == 0 {
        virtual_name.into()
    } else {
        smol_str::format_smolstr!("{prefix} {id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TWO_CPUS;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn parse_two_cpus() {
        let data = parse_log(TWO_CPUS).unwrap();
        assert_eq!(
            data.cpu_decls,
            [
                CpuDecl {
                    id: 1,
                    name: "Controller".into()
                },
                CpuDecl {
                    id: 2,
                    name: "CPU 2".into()
                },
            ]
        );
        assert_eq!(
            data.bus_decls,
            [BusDecl {
                id: 1,
                name: "net".into(),
                topology: vec![1, 2],
            }]
        );
        assert_eq!(data.timestamps, [0, 2, 4, 6, 10, 12, 14]);
        assert_eq!(data.execution_events.len(), 10, "declarations are not events");

        let cpu1 = data.cpu(1).unwrap();
        assert_eq!(cpu1.deploy_events.len(), 1);
        assert!(
            cpu1.execution_events
                .iter()
                .all(|e| e.kind != EventKind::MessageActivate)
        );
        assert_eq!(cpu1.timestamps, [0, 2, 4, 12, 14]);

        // The first completion answers a message request and inherits its operation.
        let completed = &data.cpu(2).unwrap().execution_events[0];
        assert_eq!(completed.kind, EventKind::MessageCompleted);
        assert_eq!(completed.opname.as_deref(), Some("Actuator`set"));
        assert_eq!(completed.objref, Some(4));
        assert_eq!((completed.busid, completed.callthr), (Some(1), Some(7)));

        // The second answers a reply and only inherits the route.
        let reply_completed = cpu1
            .execution_events
            .iter()
            .find(|e| e.kind == EventKind::MessageCompleted)
            .unwrap();
        assert_eq!(reply_completed.tocpu, Some(1));
        assert_eq!(reply_completed.opname, None);
    }

    #[test]
    fn virtual_names_and_nil() {
        let data = parse_log(indoc! {"
            ThreadCreate -> id: 1 period: false objref: nil clnm: nil cpunm: 0 time: 0
            MessageRequest -> busid: 0 fromcpu: 0 tocpu: 3 msgid: 1 callthr: 1 opname: \"A`op\" objref: 2 size: 1 time: 1
        "})
        .unwrap();
        let names: Vec<_> = data.cpu_decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["vCPU"]);
        assert_eq!(data.bus_decls[0].name, "vBUS");
        assert_eq!(data.execution_events[0].objref, None);
        assert_eq!(data.execution_events[0].clnm, None);
    }

    #[test_case("ThreadKill -> id 1 time: 1", LogParseErrorKind::MalformedKey("id".to_owned()); "malformed key")]
    #[test_case("ThreadKill -> id: 1 time:", LogParseErrorKind::MissingValue("time".to_owned()); "missing value")]
    #[test_case("OpRequest -> opname: \"A`op time: 1", LogParseErrorKind::UnterminatedString; "unterminated")]
    #[test_case(
        "ThreadKill -> id: 1",
        LogParseErrorKind::MissingField { kind: "ThreadKill".to_owned(), field: "time" };
        "missing time"
    )]
    #[test_case(
        "ThreadKill -> id: -4 time: 1",
        LogParseErrorKind::InvalidValue { field: "id".to_owned(), value: "-4".to_owned() };
        "negative id"
    )]
    fn parse_errors(line: &str, expected: LogParseErrorKind) {
        let input = format!("ThreadCreate -> id: 1 cpunm: 0 time: 0\n{line}\n");
        let error = parse_log(&input).unwrap_err();
        assert_eq!(error.line(), 2);
        assert_eq!(error.kind(), &expected);
    }

    #[test]
    fn unknown_kinds_are_skipped() {
        let data = parse_log(indoc! {r#"
            ThreadCreate -> id: 1 period: false objref: 2 clnm: "A" cpunm: 1 time: 0
            ThreadSwapIn -> id: 1 objref: 2 clnm: "A" cpunm: 1 overhead: 0 time: 1
            InstVarChange -> instnm: "x" val: "1" objref: 2 id: 1 time: 3
            ThreadKill -> id: 1 cpunm: 1 time: 4
        "#})
        .unwrap();
        let kinds: Vec<_> = data.execution_events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::ThreadCreate,
                EventKind::ThreadSwapIn,
                EventKind::ThreadKill
            ]
        );
        assert_eq!(data.timestamps, [0, 1, 4]);
    }

    #[test]
    fn values() {
        assert_eq!(Value::parse_bare("12"), Value::Integer(12));
        assert_eq!(Value::parse_bare("1.5"), Value::Float(1.5));
        assert_eq!(Value::parse_bare("TRUE"), Value::Bool(true));
        assert_eq!(
            Value::parse_bare("[1,2]"),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(Value::parse_bare("nil"), Value::Str("nil".into()));
        assert_eq!(Value::Float(4.0).to_u64(), Some(4));
        assert_eq!(Value::Float(4.5).to_u64(), None);
    }
}
