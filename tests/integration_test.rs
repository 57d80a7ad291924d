//! Integration tests for marginalia
//!
//! These tests verify end-to-end functionality including:
//! - Account and document lifecycle
//! - The annotate flow from selection to rendered marker
//! - Persistence across editor sessions

use marginalia::app::App;
use marginalia::editor::{PointerEvent, SelectionSnapshot};
use marginalia::services::settings::{
    AnnotationSettings, AnnotationStyleKind, AnnotationTrigger, PopupCloseMode,
};
use marginalia::services::{AppSettings, AuthEvent, ContextAutosave};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Helper to create an app rooted in a fresh data directory
async fn create_test_app() -> (App, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let app = App::new(temp_dir.path().to_path_buf()).await.unwrap();
    (app, temp_dir)
}

fn select(text: &str, path: &[usize], offset: usize) -> Option<SelectionSnapshot> {
    Some(SelectionSnapshot {
        text: text.to_string(),
        anchor_path: path.to_vec(),
        anchor_offset: offset,
    })
}

#[tokio::test]
async fn test_annotate_end_to_end() {
    let (mut app, _temp) = create_test_app().await;

    // Sign up and create a document.
    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    let document = app.create_document("Notes").await.unwrap();
    assert_eq!(document.title, "Notes");

    // Open it and type some text.
    app.open_document(&document.id).await.unwrap();
    app.session_mut()
        .unwrap()
        .sync_content("<p>The quick fox</p>")
        .await
        .unwrap();

    // Select "quick" and attach a context note.
    assert!(app.selection_changed(select("quick", &[0, 0], 4)).await);
    let annotation = app.create_annotation("speed reference").await.unwrap();

    // Exactly one annotation exists with the expected fields.
    let annotations = app.session().unwrap().annotations().await;
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].text, "quick");
    assert_eq!(annotations[0].context, "speed reference");
    assert_eq!(annotations[0].position, 4);

    // The rendered content wraps "quick" in a marker with the default
    // highlight style: #fbbf24 at 0.3 alpha.
    let markup = app.session().unwrap().markup();
    assert_eq!(markup.matches("annotated-text").count(), 1);
    assert!(markup.contains(&format!("data-annotation-id=\"{}\"", annotation.id)));
    assert!(markup.contains("background-color: rgba(251, 191, 36, 0.3)"));
    assert_eq!(app.session().unwrap().content().plain_text(), "The quick fox");
}

#[tokio::test]
async fn test_markers_survive_save_and_reopen() {
    let (mut app, _temp) = create_test_app().await;

    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    let document = app.create_document("Notes").await.unwrap();

    app.open_document(&document.id).await.unwrap();
    app.session_mut()
        .unwrap()
        .sync_content("<p>The quick brown fox</p>")
        .await
        .unwrap();

    app.selection_changed(select("quick", &[0, 0], 4)).await;
    app.create_annotation("speed reference").await.unwrap();
    app.session_mut().unwrap().save().await.unwrap();

    // Reopen: the stored markup already contains the marker, and
    // re-application must not duplicate it.
    app.close_document();
    app.open_document(&document.id).await.unwrap();

    let markup = app.session().unwrap().markup();
    assert_eq!(markup.matches("annotated-text").count(), 1);
    assert_eq!(
        app.session().unwrap().content().plain_text(),
        "The quick brown fox"
    );

    // The marker still activates on a quick click.
    let annotations = app.session().unwrap().annotations().await;
    let id = annotations[0].id.clone();
    let t0 = Instant::now();
    let session = app.session_mut().unwrap();
    session.handle_marker_event(&id, PointerEvent::Down, t0);
    session.handle_marker_event(&id, PointerEvent::Up, t0 + Duration::from_millis(10));
    assert!(session.handle_marker_event(&id, PointerEvent::Click, t0 + Duration::from_millis(20)));
}

#[tokio::test]
async fn test_annotation_delete_and_document_cascade() {
    let (mut app, _temp) = create_test_app().await;

    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    let document = app.create_document("Notes").await.unwrap();

    app.open_document(&document.id).await.unwrap();
    app.session_mut()
        .unwrap()
        .sync_content("<p>alpha beta gamma</p>")
        .await
        .unwrap();

    app.selection_changed(select("alpha", &[0, 0], 0)).await;
    let first = app.create_annotation("first").await.unwrap();
    app.selection_changed(select("gamma", &[0, 0], 11)).await;
    app.create_annotation("third").await.unwrap();

    assert_eq!(app.annotation_count(&document.id).await.unwrap(), 2);

    // Deleting one annotation strips its marker and keeps the other.
    app.session_mut()
        .unwrap()
        .delete_annotation(&first.id)
        .await
        .unwrap();
    let markup = app.session().unwrap().markup();
    assert_eq!(markup.matches("annotated-text").count(), 1);
    assert_eq!(app.annotation_count(&document.id).await.unwrap(), 1);

    // Deleting the document cascades to the remaining annotation rows.
    app.delete_document(&document.id).await.unwrap();
    assert_eq!(app.annotation_count(&document.id).await.unwrap(), 0);
    assert!(app.session().is_none());
}

#[tokio::test]
async fn test_context_autosave_through_session() {
    let (mut app, _temp) = create_test_app().await;

    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    let document = app.create_document("Notes").await.unwrap();

    app.open_document(&document.id).await.unwrap();
    app.session_mut()
        .unwrap()
        .sync_content("<p>The quick fox</p>")
        .await
        .unwrap();

    app.selection_changed(select("quick", &[0, 0], 4)).await;
    let annotation = app.create_annotation("draft").await.unwrap();

    // Typing into the context field, then focus loss flushes immediately.
    let mut autosave =
        ContextAutosave::with_delay(app.annotations.clone(), Duration::from_millis(50));
    autosave.on_edit(&annotation.id, "draft, expanded");
    autosave
        .flush(&annotation.id, "draft, expanded and blurred")
        .await
        .unwrap();

    let stored = app.annotations.load_all(&document.id).await.unwrap();
    assert_eq!(stored[0].context, "draft, expanded and blurred");
}

#[tokio::test]
async fn test_settings_persist_across_restart() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_path_buf();

    {
        let mut app = App::new(data_dir.clone()).await.unwrap();
        app.update_settings(AppSettings {
            annotation: AnnotationSettings {
                style: AnnotationStyleKind::Underline,
                color: "#0ea5e9".to_string(),
                trigger: AnnotationTrigger::Hover,
                popup_close_mode: PopupCloseMode::XOnly,
            },
            dark_mode: true,
        })
        .await
        .unwrap();
    }

    // A second app instance over the same data directory sees the settings
    // and styles freshly opened documents with them.
    let mut app = App::new(data_dir).await.unwrap();
    let settings = app.settings.load().await.unwrap();
    assert_eq!(settings.annotation.style, AnnotationStyleKind::Underline);
    assert!(settings.dark_mode);

    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    let document = app.create_document("Notes").await.unwrap();
    app.open_document(&document.id).await.unwrap();
    app.session_mut()
        .unwrap()
        .sync_content("<p>The quick fox</p>")
        .await
        .unwrap();
    app.selection_changed(select("quick", &[0, 0], 4)).await;
    app.create_annotation("speed reference").await.unwrap();

    let markup = app.session().unwrap().markup();
    assert!(markup.contains("text-decoration-color: #0ea5e9"));
}

#[tokio::test]
async fn test_auth_events_reach_subscribers() {
    let (app, _temp) = create_test_app().await;
    let mut events = app.auth.subscribe();

    app.auth
        .sign_up("writer@example.com", "hunter22")
        .await
        .unwrap();
    app.auth.sign_out().await;

    assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));
    assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));

    // Signing out leaves the engine usable: sign back in and carry on.
    let session = app
        .auth
        .sign_in_with_password("writer@example.com", "hunter22")
        .await
        .unwrap();
    assert_eq!(session.user.email, "writer@example.com");
}
