//! Property-based invariant tests for the canvas model.
//!
//! Verifies:
//! 1. Canvas height equals max(bottom) + buffer, floored at the minimum, after every gesture
//! 2. Reflow shifts every follower by exactly the height delta and nothing above
//! 3. Committing the same rendered content twice changes nothing
//! 4. Undoing every step restores the empty canvas; redoing them restores the final state
//! 5. Tables stay rectangular with at least one row and column under any edit sequence
//! 6. Import never panics and always yields rectangular tables
//! 7. Rich text replacement keeps length arithmetic
//! 8. Tagged export parses back to the same elements with no warnings

use formdraft_core::elements::{CheckboxBody, Dropdown, ElementStyle, TextAlign, TextBody};
use formdraft_core::{
    Action, Canvas, CanvasConfig, CellRef, ConfigEdit, ContentPosition, ContentRange, Editor, Element,
    ElementBody, ElementId, ElementKind, ImportWarning, Inline, Marks, RenderedContent, RichText,
    SerializableColor, TableGrid, markup,
};
use kurbo::{Point, Size, Vec2};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_kind() -> impl Strategy<Value = ElementKind> {
    prop_oneof![
        Just(ElementKind::Text),
        Just(ElementKind::Checkbox),
        Just(ElementKind::Table),
    ]
}

fn arb_coord() -> impl Strategy<Value = f64> {
    (0u32..900).prop_map(f64::from)
}

fn arb_height() -> impl Strategy<Value = f64> {
    (0u32..400).prop_map(f64::from)
}

#[derive(Debug, Clone)]
enum Op {
    Drop { kind: ElementKind, x: f64, y: f64 },
    Commit { slot: usize, height: f64 },
    Delete { slot: usize },
    Resize { slot: usize, height: f64 },
    Move { slot: usize, x: f64, y: f64 },
    AddRow { slot: usize },
    AddColumn { slot: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (arb_kind(), arb_coord(), arb_coord()).prop_map(|(kind, x, y)| Op::Drop { kind, x, y }),
        2 => (any::<usize>(), arb_height()).prop_map(|(slot, height)| Op::Commit { slot, height }),
        1 => any::<usize>().prop_map(|slot| Op::Delete { slot }),
        1 => (any::<usize>(), arb_height()).prop_map(|(slot, height)| Op::Resize { slot, height }),
        1 => (any::<usize>(), arb_coord(), arb_coord()).prop_map(|(slot, x, y)| Op::Move { slot, x, y }),
        1 => any::<usize>().prop_map(|slot| Op::AddRow { slot }),
        1 => any::<usize>().prop_map(|slot| Op::AddColumn { slot }),
    ]
}

fn nth_id(editor: &Editor, slot: usize) -> Option<ElementId> {
    let len = editor.canvas().len();
    if len == 0 {
        return None;
    }
    editor.canvas().elements().nth(slot % len).map(|e| e.id())
}

/// Turn an op into actions against the current canvas. Ops that need an
/// element are skipped on an empty canvas.
fn to_actions(editor: &Editor, op: &Op) -> Vec<Action> {
    let target = |slot: usize| nth_id(editor, slot);
    match *op {
        Op::Drop { kind, x, y } => vec![Action::Drop {
            x,
            y,
            payload: Some(kind.to_string()),
        }],
        Op::Commit { slot, height } => target(slot)
            .map(|id| vec![Action::Commit { id, content: None, height }])
            .unwrap_or_default(),
        Op::Delete { slot } => target(slot).map(|id| vec![Action::Delete { id }]).unwrap_or_default(),
        Op::Resize { slot, height } => target(slot)
            .map(|id| {
                vec![Action::Configure {
                    id,
                    edit: ConfigEdit::Height(height),
                }]
            })
            .unwrap_or_default(),
        Op::Move { slot, x, y } => target(slot)
            .and_then(|id| {
                let origin = editor.canvas().element(id)?.origin;
                Some(vec![
                    Action::BeginElementDrag {
                        id,
                        x: origin.x,
                        y: origin.y,
                    },
                    Action::Drop { x, y, payload: None },
                ])
            })
            .unwrap_or_default(),
        Op::AddRow { slot } => target(slot).map(|id| vec![Action::AddRow { id }]).unwrap_or_default(),
        Op::AddColumn { slot } => target(slot)
            .map(|id| vec![Action::AddColumn { id }])
            .unwrap_or_default(),
    }
}

fn expected_height(canvas: &Canvas) -> f64 {
    let config = canvas.config();
    let lowest = canvas.elements().map(|e| e.bottom()).fold(0.0, f64::max);
    (lowest + config.buffer_space).max(config.minimum_height)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Canvas height invariant
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn canvas_height_tracks_lowest_element(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut editor = Editor::default();
        for op in &ops {
            let actions = to_actions(&editor, op);
            editor.dispatch_gesture(actions);
            prop_assert_eq!(editor.canvas().canvas_height(), expected_height(editor.canvas()), "after {:?}", op);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Reflow delta propagation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reflow_shifts_followers_by_delta(
        heights in prop::collection::vec(1u32..200, 2..8),
        pick in any::<usize>(),
        new_height in 1u32..300,
    ) {
        let mut canvas = Canvas::default();
        let mut ids = Vec::new();
        for (i, height) in heights.iter().enumerate() {
            let id = canvas.create_element(ElementKind::Text, Point::new(0.0, 100.0 + i as f64), Vec2::ZERO);
            canvas.commit(id, RenderedContent { content: None, height: f64::from(*height) }).unwrap();
            ids.push(id);
        }
        canvas.reflow_from(ids[0]).unwrap();

        let k = pick % ids.len();
        let before: Vec<f64> = ids.iter().map(|id| canvas.element(*id).unwrap().origin.y).collect();
        let delta = f64::from(new_height) - f64::from(heights[k]);
        canvas.commit(ids[k], RenderedContent { content: None, height: f64::from(new_height) }).unwrap();
        canvas.reflow_from(ids[k]).unwrap();

        for (j, id) in ids.iter().enumerate() {
            let y = canvas.element(*id).unwrap().origin.y;
            if j <= k {
                prop_assert_eq!(y, before[j]);
            } else {
                prop_assert_eq!(y, before[j] + delta);
            }
        }
        prop_assert_eq!(canvas.canvas_height(), expected_height(&canvas));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Idempotent commit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn commit_twice_is_idempotent(
        ops in prop::collection::vec(arb_op(), 1..15),
        slot in any::<usize>(),
        height in arb_height(),
        text in "[a-zA-Z ]{0,20}",
    ) {
        let mut editor = Editor::default();
        for op in &ops {
            let actions = to_actions(&editor, op);
            editor.dispatch_gesture(actions);
        }
        let Some(id) = nth_id(&editor, slot) else {
            return Ok(());
        };
        let content = (editor.canvas().element(id).unwrap().kind() == ElementKind::Text)
            .then(|| RichText::plain(&text));
        let commit = Action::Commit { id, content, height };

        editor.dispatch(commit.clone());
        let once = editor.state().clone();
        editor.dispatch(commit);
        prop_assert_eq!(editor.state(), &once);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Undo/redo round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undo_all_then_redo_all(ops in prop::collection::vec(arb_op(), 1..30)) {
        let mut editor = Editor::default();
        for op in &ops {
            let actions = to_actions(&editor, op);
            editor.dispatch_gesture(actions);
        }
        let last = editor.state().clone();

        while editor.undo() {}
        prop_assert!(editor.canvas().is_empty());
        prop_assert_eq!(editor.canvas().canvas_height(), CanvasConfig::default().minimum_height);

        while editor.redo() {}
        prop_assert!(editor.state().same_content(&last));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Table dimension invariant
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum TableOp {
    AddRow,
    AddColumn,
    InsertRow(usize),
    InsertColumn(usize),
    DeleteRow(usize),
    DeleteColumn(usize),
    Edit(usize, usize),
}

fn arb_table_op() -> impl Strategy<Value = TableOp> {
    prop_oneof![
        Just(TableOp::AddRow),
        Just(TableOp::AddColumn),
        (0usize..6).prop_map(TableOp::InsertRow),
        (0usize..6).prop_map(TableOp::InsertColumn),
        (0usize..6).prop_map(TableOp::DeleteRow),
        (0usize..6).prop_map(TableOp::DeleteColumn),
        (0usize..6, 0usize..6).prop_map(|(r, c)| TableOp::Edit(r, c)),
    ]
}

proptest! {
    #[test]
    fn table_stays_rectangular(ops in prop::collection::vec(arb_table_op(), 0..50)) {
        let mut grid = TableGrid::default();
        for op in ops {
            let (rows, cols) = (grid.rows(), grid.cols());
            let result = match op {
                TableOp::AddRow => {
                    grid.add_row();
                    Ok(())
                }
                TableOp::AddColumn => {
                    grid.add_column();
                    Ok(())
                }
                TableOp::InsertRow(at) => grid.insert_row(at),
                TableOp::InsertColumn(at) => grid.insert_column(at),
                TableOp::DeleteRow(at) => grid.delete_row(at),
                TableOp::DeleteColumn(at) => grid.delete_column(at),
                TableOp::Edit(r, c) => grid.edit_cell(CellRef::new(r, c), "x"),
            };
            prop_assert!(grid.is_well_formed());
            prop_assert!(grid.rows() >= 1 && grid.cols() >= 1);
            if result.is_err() {
                prop_assert_eq!((grid.rows(), grid.cols()), (rows, cols));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Parse totality
// ═════════════════════════════════════════════════════════════════════════

fn arb_markup() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just("<div>"),
        Just("</div>"),
        Just("<div data-kind=\"table\">"),
        Just("<div style=\"left: 12px; top: 7.5px; width: 40px\">"),
        Just("<table>"),
        Just("</table>"),
        Just("<tr>"),
        Just("</tr>"),
        Just("<td>"),
        Just("</td>"),
        Just("<input type=\"checkbox\" checked>"),
        Just("<br>"),
        Just("<b>"),
        Just("</b>"),
        Just("&nbsp;"),
        Just("& "),
        Just("{{Name}}"),
        Just("text "),
        Just("<select><option>A</option></select>"),
    ];
    prop::collection::vec(fragment, 0..25).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn parse_is_total_on_markup_fragments(input in arb_markup()) {
        let outcome = markup::parse(&input);
        for element in &outcome.elements {
            if let Some(grid) = element.table() {
                prop_assert!(grid.is_well_formed());
            }
        }
        if outcome.warnings.iter().any(|w| matches!(w, ImportWarning::MalformedImport(_))) {
            prop_assert_eq!(outcome.elements.len(), 1);
        }
    }

    #[test]
    fn parse_is_total_on_any_string(input in any::<String>()) {
        let outcome = markup::parse(&input);
        let ids: Vec<u64> = outcome.elements.iter().map(|e| e.id().0).collect();
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        prop_assert_eq!(ids, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Rich text length arithmetic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn replace_range_length(
        text in "[a-z ]{0,30}",
        a in any::<usize>(),
        b in any::<usize>(),
        token in prop::bool::ANY,
    ) {
        let mut content = RichText::plain(&text);
        let len = content.len();
        let (a, b) = (a % (len + 1), b % (len + 1));
        let range = ContentRange::new(content.from_flat(a), content.from_flat(b));
        let inline = if token { Inline::token("Name") } else { Inline::span("xy") };
        let inserted = inline.len();

        let caret = content.replace_range(range, inline).unwrap();
        prop_assert_eq!(content.len(), len - a.abs_diff(b) + inserted);
        prop_assert_eq!(content.to_flat(caret), Some(a.min(b) + inserted));
        prop_assert!(content.contains(ContentPosition::default()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Tagged export round trip
// ═════════════════════════════════════════════════════════════════════════

/// Any text XML can carry, braces included.
const XML_TEXT: &str = r"[^\x00-\x08\x0B\x0C\x0E-\x1F\x{FFFE}\x{FFFF}]{0,12}";
/// Span text; braces would read back as placeholder tokens.
const SPAN_TEXT: &str = r"[^{}\x00-\x08\x0B\x0C\x0E-\x1F\x{FFFE}\x{FFFF}]{1,12}";

fn arb_quarter(max: u32) -> impl Strategy<Value = f64> {
    (0..max * 4).prop_map(|q| f64::from(q) / 4.0)
}

fn arb_color() -> impl Strategy<Value = SerializableColor> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b, a)| SerializableColor::new(r, g, b, a))
}

fn arb_marks() -> impl Strategy<Value = Marks> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop::option::of(arb_color()),
        prop::option::of(1u32..200),
    )
        .prop_map(|(bold, italic, underline, color, font_size)| Marks {
            bold,
            italic,
            underline,
            color,
            font_size,
        })
}

fn arb_dropdown() -> impl Strategy<Value = Dropdown> {
    (prop::collection::vec(XML_TEXT, 1..4), any::<prop::sample::Index>(), any::<bool>()).prop_map(
        |(options, pick, chosen)| {
            let selected = chosen.then(|| pick.index(options.len()));
            Dropdown { options, selected }
        },
    )
}

fn arb_inline() -> impl Strategy<Value = Inline> {
    prop_oneof![
        3 => (SPAN_TEXT, arb_marks()).prop_map(|(text, marks)| Inline::Span { text, marks }),
        1 => "[A-Za-z][A-Za-z0-9_]{0,8}".prop_map(Inline::token),
        1 => arb_dropdown().prop_map(Inline::Dropdown),
        1 => any::<bool>().prop_map(|checked| Inline::Checkbox { checked }),
        1 => Just(Inline::LineBreak),
    ]
}

fn arb_align() -> impl Strategy<Value = TextAlign> {
    prop_oneof![
        Just(TextAlign::Left),
        Just(TextAlign::Center),
        Just(TextAlign::Right),
        Just(TextAlign::Justify),
    ]
}

fn arb_body() -> impl Strategy<Value = ElementBody> {
    prop_oneof![
        (prop::collection::vec(arb_inline(), 0..8), arb_align()).prop_map(|(nodes, align)| {
            ElementBody::Text(TextBody {
                content: RichText::new(nodes),
                align,
            })
        }),
        (any::<bool>(), XML_TEXT).prop_map(|(checked, label)| ElementBody::Checkbox(CheckboxBody { checked, label })),
        (1usize..4, 1usize..4)
            .prop_flat_map(|(rows, cols)| prop::collection::vec(prop::collection::vec(XML_TEXT, cols), rows))
            .prop_filter_map("rectangular", |rows| TableGrid::from_rows(rows).map(ElementBody::Table)),
    ]
}

fn arb_element() -> impl Strategy<Value = Element> {
    (
        arb_quarter(800),
        arb_quarter(2000),
        arb_quarter(600),
        arb_quarter(400),
        prop::option::of(arb_color()),
        arb_quarter(40),
        arb_quarter(40),
        arb_body(),
    )
        .prop_map(|(x, y, width, height, background_color, margin, padding, body)| {
            let mut element = Element::with_body(ElementId(0), Point::new(x, y), Size::new(width, height), body);
            element.style = ElementStyle {
                background_color,
                margin,
                padding,
            };
            element
        })
}

proptest! {
    #[test]
    fn tagged_export_round_trips(mut elements in prop::collection::vec(arb_element(), 0..5)) {
        // Import numbers elements from 1 in document order.
        for (index, element) in elements.iter_mut().enumerate() {
            let mut numbered = Element::with_body(
                ElementId(index as u64 + 1),
                element.origin,
                element.size,
                element.body.clone(),
            );
            numbered.style = element.style.clone();
            *element = numbered;
        }
        let exported = elements.iter().map(markup::serialize_element).collect::<Vec<_>>().join("\n");

        let outcome = markup::parse(&exported);
        prop_assert!(outcome.warnings.is_empty(), "warnings {:?} for {}", outcome.warnings, exported);
        prop_assert_eq!(outcome.elements, elements);
    }
}
