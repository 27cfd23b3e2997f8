mod common;

use std::time::Instant;

use common::*;
use pdfpane::pdf::{Size, Source, ViewerEvent};
use pdfpane::PdfViewerBlock;

fn pump(block: &mut PdfViewerBlock, mut pred: impl FnMut(&ViewerEvent) -> bool) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::new();
    loop {
        let events = block.poll();
        let hit = events.iter().any(&mut pred);
        seen.extend(events);
        if hit {
            return seen;
        }
        assert!(Instant::now() < deadline, "timed out; saw {seen:?}");
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
}

fn block_with(pages: usize) -> (PdfViewerBlock, Surfaces) {
    let engine = FakeEngine::new();
    let surfaces = Surfaces::new(Some(Size::new(800.0, 1000.0)));
    let mut block = PdfViewerBlock::new(engine, config());
    block.attach(surfaces.pair());
    block.open(
        Source::from_bytes(pdf_bytes(pages)),
        Some("report.pdf".to_string()),
        Some("1.5 KB".to_string()),
    );
    pump(&mut block, is_ready);
    (block, surfaces)
}

#[test]
fn opens_at_default_zoom_on_first_page() {
    let (block, _surfaces) = block_with(3);
    assert_eq!(block.page(), 1);
    assert_eq!(block.total_pages(), 3);
    assert_eq!(block.scale(), 1.25);
    assert_eq!(block.scale_text(), "125");
    assert_eq!(block.page_text(), "1");
    assert!(!block.is_loading());
    assert_eq!(block.error(), None);
    assert_eq!(block.display_name(), "report.pdf (1.5 KB)");
    assert_eq!(block.page_label().as_deref(), Some("3 pages"));
    assert_eq!(block.controller().observed().current_scale, 1.25);
}

#[test]
fn unparseable_scale_text_reverts_on_commit() {
    let (mut block, _surfaces) = block_with(2);

    block.edit_scale_input("abc");
    assert_eq!(block.scale_text(), "abc");
    assert_eq!(block.scale(), 1.25);

    block.commit_scale_input();
    assert_eq!(block.scale_text(), "125");
    assert_eq!(block.scale(), 1.25);
    assert!(block.poll().is_empty());
    assert_eq!(block.controller().desired().scale, 1.25);
}

#[test]
fn typed_scale_applies_while_editing() {
    let (mut block, _surfaces) = block_with(2);

    block.edit_scale_input("150%");
    assert_eq!(block.scale_text(), "150%");
    assert_eq!(block.scale(), 1.5);
    assert_eq!(block.poll(), vec![ViewerEvent::ScaleChanged(1.5)]);

    block.commit_scale_input();
    assert_eq!(block.scale_text(), "150");

    // typed percentages are clamped to the input range
    block.edit_scale_input("5");
    block.commit_scale_input();
    assert_eq!(block.scale_text(), "10");
    block.edit_scale_input("1000");
    block.commit_scale_input();
    assert_eq!(block.scale_text(), "400");
    assert_eq!(block.scale(), 4.0);
}

#[test]
fn escape_restores_committed_scale() {
    let (mut block, _surfaces) = block_with(1);
    block.edit_scale_input("2");
    block.edit_scale_input("");
    block.revert_scale_input();
    // "2" was applied (clamped to 10%) before the field was cleared
    assert_eq!(block.scale_text(), "10");
}

#[test]
fn zoom_buttons_stop_at_limits() {
    let (mut block, _surfaces) = block_with(1);

    for _ in 0..20 {
        block.zoom_in();
    }
    assert_eq!(block.scale(), 3.0);
    assert_eq!(block.scale_text(), "300");
    assert!(!block.can_zoom_in());
    assert!(block.can_zoom_out());

    for _ in 0..20 {
        block.zoom_out();
    }
    assert_eq!(block.scale(), 0.5);
    assert!(!block.can_zoom_out());

    block.reset_zoom();
    assert_eq!(block.scale(), 1.25);
    block.poll();
    assert_eq!(block.controller().observed().current_scale, 1.25);
}

#[test]
fn page_input_jumps_and_clamps() {
    let (mut block, _surfaces) = block_with(3);

    block.edit_page_input("2");
    assert_eq!(block.page(), 2);
    assert_eq!(block.poll(), vec![ViewerEvent::PageChanged(2)]);

    block.edit_page_input("9");
    block.commit_page_input();
    assert_eq!(block.page(), 3);
    assert_eq!(block.page_text(), "3");

    block.edit_page_input("x");
    assert_eq!(block.page(), 3);
    block.commit_page_input();
    assert_eq!(block.page_text(), "3");

    block.edit_page_input("-5");
    block.commit_page_input();
    assert_eq!(block.page(), 1);
}

#[test]
fn prev_and_next_respect_bounds() {
    let (mut block, _surfaces) = block_with(2);
    assert!(!block.can_go_prev());
    block.prev_page();
    assert_eq!(block.page(), 1);

    block.next_page();
    block.next_page();
    assert_eq!(block.page(), 2);
    assert!(!block.can_go_next());
    assert!(block.can_go_prev());

    block.poll();
    assert_eq!(block.controller().observed().current_page, 2);
}

#[test]
fn fit_updates_zoom() {
    let (mut block, _surfaces) = block_with(2);

    let id = block.fit_height().unwrap();
    pump(&mut block, |e| {
        matches!(e, ViewerEvent::FitResolved { id: done, .. } if *done == id)
    });
    assert_eq!(block.scale_text(), "123");

    block.poll();
    let applied = block.controller().observed().current_scale;
    assert!((applied - 984.0 / PAGE_HEIGHT).abs() < 1e-4, "{applied}");
}

#[test]
fn scrolling_moves_page_field() {
    let (mut block, _surfaces) = block_with(3);
    block.reset_zoom();
    block.scroll_by(PAGE_HEIGHT * 1.25);
    block.poll();
    assert_eq!(block.page(), 2);
    assert_eq!(block.page_text(), "2");
}

#[test]
fn failed_load_shows_error_until_dismissed() {
    let engine = FakeEngine::new();
    let surfaces = Surfaces::new(Some(Size::new(800.0, 1000.0)));
    let mut block = PdfViewerBlock::new(engine, config());
    block.attach(surfaces.pair());

    block.open(Source::from_bytes(b"not a pdf".to_vec()), None, None);
    pump(&mut block, |e| matches!(e, ViewerEvent::LoadFailed(_)));

    let message = block.error().unwrap();
    assert!(message.starts_with("Unable to render PDF"), "{message}");
    assert_eq!(block.total_pages(), 0);
    assert_eq!(block.page_label(), None);
    assert_eq!(block.display_name(), "PDF document");

    block.dismiss_error();
    assert_eq!(block.error(), None);
}

#[test]
fn empty_source_reports_missing_document() {
    let (mut block, _surfaces) = block_with(4);
    block.next_page();

    block.open(Source::Empty, None, None);
    assert_eq!(block.error(), Some("No document provided."));
    assert_eq!(block.poll(), vec![ViewerEvent::DocumentReady(0)]);
    assert_eq!(block.total_pages(), 0);
    assert_eq!(block.page(), 1);
    assert!(!block.can_go_next());

    // a new document clears the message
    block.open(Source::from_bytes(pdf_bytes(1)), None, None);
    assert_eq!(block.error(), None);
}

#[test]
fn unmount_is_idempotent() {
    let (mut block, _surfaces) = block_with(2);
    block.unmount();
    block.unmount();
    assert!(!block.controller().is_alive());
    assert!(block.poll().is_empty());
}
