//! End-to-end editing sessions: tools drive an [`Editor`] through pointer
//! gestures, and the resulting commands round-trip through history.

use egui::Modifiers;
use image::Rgba;
use strata::Editor;
use strata::tools::{
    BrushTool, CropTool, FreeTransformTool, LassoTool, PointerInput, RectangleSelectTool,
};
use strata::transform::Transform;

const RED: [u8; 4] = [255, 0, 0, 255];

fn shift() -> Modifiers {
    Modifiers {
        shift: true,
        ..Modifiers::NONE
    }
}

#[test]
fn rect_then_lasso_builds_a_union_selection() {
    let mut editor = Editor::new("selection-session", 100, 100);

    let mut rect = RectangleSelectTool::new();
    rect.pointer_down(PointerInput::at(10.0, 10.0));
    rect.pointer_move(PointerInput::at(30.0, 30.0));
    let events = rect.pointer_up(PointerInput::at(50.0, 50.0), &editor.project);
    editor.handle_events(events);

    let selection = editor.project.selection.as_ref().unwrap();
    assert_eq!(selection.bounds(), Some((10, 10, 50, 50)));

    // Shift-add a triangle in the lower-right region.
    let mut lasso = LassoTool::new();
    lasso.pointer_down(PointerInput::at(60.0, 60.0).with_modifiers(shift()));
    lasso.pointer_move(PointerInput::at(90.0, 60.0).with_modifiers(shift()));
    lasso.pointer_move(PointerInput::at(60.0, 90.0).with_modifiers(shift()));
    let events = lasso.pointer_up(
        PointerInput::at(60.0, 90.0).with_modifiers(shift()),
        &editor.project,
    );
    editor.handle_events(events);

    let selection = editor.project.selection.as_ref().unwrap();
    assert_eq!(selection.get(20, 20), 255, "rectangle survives the add");
    assert_eq!(selection.get(65, 65), 255, "triangle interior added");
    assert_eq!(selection.get(55, 55), 0, "gap between the shapes stays clear");

    // Both selection steps undo independently.
    editor.undo();
    assert_eq!(
        editor.project.selection.as_ref().unwrap().get(65, 65),
        0,
        "undo removes the lasso contribution"
    );
    editor.undo();
    assert!(editor.project.selection.is_none());
}

#[test]
fn crop_session_is_byte_exact_under_undo() {
    let mut editor = Editor::new("crop-session", 200, 200);
    let id = editor.project.active_layer.unwrap();
    editor
        .project
        .buffer_mut(id)
        .unwrap()
        .put_pixel(25, 25, Rgba(RED));
    let snapshot = editor.project.clone();

    let mut crop = CropTool::new();
    crop.pointer_down(PointerInput::at(20.0, 20.0), &editor.project);
    crop.pointer_up(PointerInput::at(120.0, 120.0), &editor.project);
    let events = crop.commit(&editor.project, &editor.fonts);
    editor.handle_events(events);

    let layer = editor.project.layer(id).unwrap();
    assert_eq!((layer.width, layer.height), (100, 100));
    assert_eq!(layer.transform, Transform::from_translation(20.0, 20.0));
    assert_eq!(
        editor.project.buffer(id).unwrap().get_pixel(5, 5).0,
        RED,
        "marker pixel moved into crop-local coordinates"
    );

    editor.undo();
    assert_eq!(editor.project, snapshot);
}

#[test]
fn paint_transform_undo_redo_session() {
    let mut editor = Editor::new("stroke-session", 64, 64);
    let id = editor.project.active_layer.unwrap();

    let mut brush = BrushTool::new(3.0, RED);
    brush.pointer_down(PointerInput::at(20.0, 20.0), &mut editor.project);
    brush.pointer_move(PointerInput::at(30.0, 20.0), &mut editor.project);
    let events = brush.pointer_up(PointerInput::at(30.0, 20.0), &editor.project);
    editor.handle_events(events);
    assert_eq!(editor.project.buffer(id).unwrap().get_pixel(25, 20).0, RED);

    // Drag the layer body 10 px right with the free transform tool.
    let mut transform = FreeTransformTool::new();
    transform.pointer_down(PointerInput::at(32.0, 32.0), &editor.project);
    let events = transform.pointer_up(PointerInput::at(42.0, 32.0), &mut editor.project);
    editor.handle_events(events);
    assert_eq!(
        editor.project.layer(id).unwrap().transform.translate_x,
        10.0
    );

    assert_eq!(editor.undo().as_deref(), Some("Transform Layer"));
    assert_eq!(editor.project.layer(id).unwrap().transform, Transform::IDENTITY);
    assert_eq!(editor.undo().as_deref(), Some("Brush Stroke"));
    assert_eq!(
        editor.project.buffer(id).unwrap().get_pixel(25, 20).0,
        [0, 0, 0, 0]
    );

    assert!(editor.redo().is_some());
    assert!(editor.redo().is_some());
    assert_eq!(editor.project.buffer(id).unwrap().get_pixel(25, 20).0, RED);
    assert_eq!(
        editor.project.layer(id).unwrap().transform.translate_x,
        10.0
    );
}

#[test]
fn save_edit_load_discards_unsaved_changes() {
    let mut editor = Editor::new("persist-session", 32, 32);
    let id = editor.project.active_layer.unwrap();
    editor
        .project
        .buffer_mut(id)
        .unwrap()
        .put_pixel(4, 4, Rgba(RED));
    let archive = editor.save().unwrap();

    // Paint over the saved pixel, then reload the archive.
    let mut brush = BrushTool::new(5.0, [0, 255, 0, 255]);
    brush.pointer_down(PointerInput::at(4.0, 4.0), &mut editor.project);
    let events = brush.pointer_up(PointerInput::at(4.0, 4.0), &editor.project);
    editor.handle_events(events);
    assert_ne!(editor.project.buffer(id).unwrap().get_pixel(4, 4).0, RED);

    editor.load(&archive).unwrap();
    assert_eq!(editor.project.buffer(id).unwrap().get_pixel(4, 4).0, RED);
    assert!(!editor.history.can_undo());
}
