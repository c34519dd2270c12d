//! Property-based tests for buffer, registry and parsing invariants.

use std::io::Cursor;

use proptest::prelude::*;

use envy_multiplexer::buffer::{LineKind, OutputBuffer, OutputLine};
use envy_multiplexer::pane::PaneId;
use envy_multiplexer::process::{self, SessionEvent, StreamKind};
use envy_multiplexer::profile::{parse_vars, render_vars};
use envy_multiplexer::registry::PaneRegistry;

/// A registry operation.
#[derive(Debug, Clone)]
enum Op {
    Create,
    CloseActive,
    CloseAt(usize),
    SetActive(usize),
    Next,
    Prev,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Create),
        Just(Op::CloseActive),
        (0usize..8).prop_map(Op::CloseAt),
        (0usize..8).prop_map(Op::SetActive),
        Just(Op::Next),
        Just(Op::Prev),
    ]
}

/// Listener that ignores every notification.
#[derive(Clone)]
struct Quiet;

impl process::EventListener for Quiet {
    fn send_event(&self, _event: SessionEvent) {}
}

proptest! {
    /// After any number of appends only the most recent `capacity` remain,
    /// in order.
    #[test]
    fn buffer_keeps_most_recent(count in 0usize..3000, capacity in 1usize..1200) {
        let buffer = OutputBuffer::with_capacity(capacity);
        for i in 0..count {
            buffer.push(LineKind::Stdout, i.to_string());
        }

        let lines = buffer.lines();
        prop_assert_eq!(lines.len(), count.min(capacity));
        let first = count.saturating_sub(capacity);
        for (offset, line) in lines.iter().enumerate() {
            prop_assert_eq!(&line.text, &(first + offset).to_string());
        }
    }

    /// A pump preserves the order of the lines it reads.
    #[test]
    fn pump_preserves_order(lines in proptest::collection::vec("[a-zA-Z0-9 ]{0,20}", 0..50)) {
        let mut input = lines.join("\n");
        if !lines.is_empty() {
            input.push('\n');
        }
        let buffer = OutputBuffer::new();
        process::pump(PaneId(1), StreamKind::Stdout, Cursor::new(input), &buffer, &Quiet);

        let got: Vec<String> = buffer.lines().into_iter().map(|l: OutputLine| l.text).collect();
        prop_assert_eq!(got, lines);
    }

    /// The registry never becomes empty and its active index stays in range.
    #[test]
    fn registry_active_index_in_range(ops in proptest::collection::vec(arb_op(), 0..60)) {
        let mut reg = PaneRegistry::new();
        let mut seen_ids = vec![reg.active_pane().id()];

        for op in ops {
            match op {
                Op::Create => {
                    let id = reg.create_pane();
                    prop_assert!(!seen_ids.contains(&id));
                    seen_ids.push(id);
                    prop_assert_eq!(reg.active_pane().id(), id);
                },
                Op::CloseActive => {
                    let before = reg.len();
                    let result = reg.close_active();
                    prop_assert_eq!(result.is_err(), before == 1);
                },
                Op::CloseAt(idx) => {
                    if let Some(id) = reg.panes().get(idx).map(|p| p.id()) {
                        let active = reg.active_pane().id();
                        if reg.close_pane(id).is_ok() && id != active {
                            prop_assert_eq!(reg.active_pane().id(), active);
                        }
                    }
                },
                Op::SetActive(idx) => {
                    let before = reg.active_index();
                    reg.set_active(idx);
                    let expected = if idx < reg.len() { idx } else { before };
                    prop_assert_eq!(reg.active_index(), expected);
                },
                Op::Next => reg.focus_next(),
                Op::Prev => reg.focus_prev(),
            }
            prop_assert!(reg.len() >= 1);
            prop_assert!(reg.active_index() < reg.len());
        }
    }

    /// Rendering variables and parsing them back yields the same map.
    #[test]
    fn profile_vars_survive_rendering(
        vars in proptest::collection::btree_map("[A-Z_][A-Z0-9_]{0,10}", "[a-z0-9/:.-]{0,16}", 0..10),
    ) {
        let text = render_vars("# header\n", &vars);
        prop_assert_eq!(parse_vars(&text), vars);
    }
}
