//! Page history, menu cache and microhistory replay.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;
use zenith_navigator::cache::page_history::{Captured, PageRecord};
use zenith_navigator::memory::{RecordingRegistry, RecordingTransport};
use zenith_navigator::url_hash::Startup;
use zenith_navigator::utils::hash;
use zenith_navigator::{
    AddOutcome, Dispatch, LinkClick, MemoryViewPort, MenuCache, NavError, NavState, Navigator, NavigatorConfig,
    NoticeLevel, PageHistory, PageSnapshot, Primer, Relation, ResponseEnvelope, RouteParams, ScriptDescriptor,
    Trigger,
};

type TestNavigator = Navigator<MemoryViewPort, RecordingTransport, RecordingRegistry>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn navigator(config: NavigatorConfig) -> TestNavigator {
    let mut nav = Navigator::new(
        config,
        MemoryViewPort::at("index.php"),
        RecordingTransport::new(),
        RecordingRegistry::default(),
    )
    .unwrap();
    nav.page_ready();
    nav
}

/// Click through to `route` and render a page whose menu is `menu_key`.
fn visit(nav: &mut TestNavigator, route: &str, menu_key: &str, rel: Option<&str>) {
    let click = LinkClick {
        rel: rel.map(str::to_string),
        ..LinkClick::new(route)
    };
    let Dispatch::Sent(id) = nav.request(Trigger::Link(click)) else {
        panic!("request for {route} was not sent");
    };
    let envelope: ResponseEnvelope = serde_json::from_value(json!({
        "success": true,
        "message": format!("<h1>{route}</h1>"),
        "_menu": format!("<ul>{menu_key}</ul>"),
        "_menuHash": menu_key,
        "_selflink": route,
        "_scripts": [],
        "_params": {"route": route}
    }))
    .unwrap();
    nav.on_response(id, envelope);
    assert_eq!(nav.state(), NavState::Idle);
}

/// Click through to `route` and feed back `body` as the server's answer.
fn respond(nav: &mut TestNavigator, route: &str, body: serde_json::Value) {
    let Dispatch::Sent(id) = nav.request(Trigger::Link(LinkClick::new(route))) else {
        panic!("request for {route} was not sent");
    };
    let envelope: ResponseEnvelope = serde_json::from_value(body).unwrap();
    nav.on_response(id, envelope);
}

fn held(nav: &TestNavigator) -> Vec<(usize, PageSnapshot)> {
    nav.history()
        .entries()
        .map(|(index, page)| (index, page.clone()))
        .collect()
}

fn record(key: &str, relation: Option<Relation>) -> PageRecord {
    PageRecord {
        bookmark_key: key.to_string(),
        script_files: vec![ScriptDescriptor::new("x.js", true)],
        menu_key: "m1".to_string(),
        route_params: RouteParams::new(),
        relation,
    }
}

fn captured(content: &'static str) -> impl FnOnce() -> Captured {
    move || Captured {
        content_html: content.to_string(),
        selflink_html: String::new(),
    }
}

// ===========================================================================
// Content hasher
// ===========================================================================

#[test]
fn hash_is_deterministic_and_bounded() {
    let keys = [
        "",
        "functions.js",
        "db_structure.js",
        "sql.php?db=a&table=t",
        "ünïcødé",
        "a much longer key that overflows thirty-two bits many times over",
    ];
    for key in keys {
        let first = hash(key);
        assert_eq!(first, hash(key), "hash of {key:?} changed between calls");
        assert!(first <= 1 << 31);
    }
}

// ===========================================================================
// Menu cache
// ===========================================================================

#[test]
fn menu_cache_never_exceeds_capacity_and_evicts_oldest() {
    let mut menus = MenuCache::new(6);
    for i in 0..20 {
        let oldest = menus.keys().first().map(|k| k.to_string());
        let full = menus.len() == menus.capacity();
        let evicted = menus.add(&format!("m{i}"), "<ul/>");
        assert!(menus.len() <= 6);
        if full {
            assert_eq!(evicted, oldest);
        } else {
            assert_eq!(evicted, None);
        }
    }
    assert_eq!(menus.keys(), vec!["m14", "m15", "m16", "m17", "m18", "m19"]);
}

// ===========================================================================
// Page history
// ===========================================================================

#[test]
fn samepage_hint_updates_in_place() {
    let mut history = PageHistory::new(6);
    history.add(record("/db/1", None), captured("A"));
    let outcome = history.add(record("/db/1", Some(Relation::SamePage)), captured("A, edited"));
    assert_eq!(outcome, AddOutcome::Refreshed { index: 0 });
    assert_eq!(history.len(), 1);
    assert_eq!(history.get(0).map(|p| p.content_html.as_str()), Some("A, edited"));
}

#[test]
fn distinct_pages_advance_cursor() {
    let mut history = PageHistory::new(6);
    history.add(record("/db/1", None), captured("A"));
    history.add(record("/db/2", None), captured("B"));
    assert_eq!(history.len(), 2);
    assert_eq!(history.current_index(), 2);
}

#[test]
fn new_page_after_going_back_discards_forward_history() {
    let mut history = PageHistory::new(6);
    for key in ["/a", "/b", "/c"] {
        history.add(record(key, None), captured("x"));
    }
    history.set_current(1).unwrap();
    assert_eq!(history.current_index(), 2);
    history.set_current(0).unwrap();

    let outcome = history.add(record("/d", Some(Relation::NewPage)), captured("D"));
    assert_eq!(outcome, AddOutcome::Appended { index: 1 });
    assert_eq!(history.len(), 2);
    let keys: Vec<_> = history.entries().map(|(_, p)| p.bookmark_key.as_str()).collect();
    assert_eq!(keys, vec!["/a", "/d"]);
}

// ===========================================================================
// Microhistory replay
// ===========================================================================

#[test]
fn navigate_replays_snapshot() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "db_structure.php?db=a", "m1", None);
    visit(&mut nav, "sql.php?db=a", "m2", None);

    nav.navigate(0).unwrap();
    let view = nav.view();
    assert_eq!(view.content, "<h1>db_structure.php?db=a</h1>");
    assert_eq!(view.menu.as_deref(), Some("<ul>m1</ul>"));
    assert_eq!(view.selflink_html, "<a href=\"db_structure.php?db=a\"></a>");
    assert_eq!(nav.route_params().get("route"), Some(&json!("db_structure.php?db=a")));
    assert_eq!(nav.history().current_index(), 1);
    assert_eq!(nav.state(), NavState::Idle);
    assert_eq!(nav.transport().sent.len(), 2);
}

#[test]
fn back_then_new_page_via_navigator() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "a.php", "m1", None);
    visit(&mut nav, "b.php", "m2", None);
    visit(&mut nav, "c.php", "m3", None);
    nav.navigate(1).unwrap();
    assert_eq!(nav.history().current_index(), 2);

    nav.navigate(0).unwrap();
    visit(&mut nav, "d.php", "m4", Some("newpage"));
    assert_eq!(nav.history().len(), 2);
    assert_eq!(nav.history().current_index(), 2);
    assert_eq!(nav.history().get(1).map(|p| p.bookmark_key.as_str()), Some("d.php"));
}

#[test]
fn invalid_replay_changes_nothing() {
    let config = NavigatorConfig {
        page_capacity: 2,
        menu_capacity: 2,
        ..NavigatorConfig::default()
    };
    let mut nav = navigator(config);
    visit(&mut nav, "a.php", "m1", None);
    visit(&mut nav, "b.php", "m2", None);
    visit(&mut nav, "c.php", "m3", None);

    let slots_before = held(&nav);
    let content_before = nav.view().content.clone();

    for index in [0, 7] {
        let err = nav.navigate(index).unwrap_err();
        assert!(matches!(err, NavError::InvalidPage { index: i } if i == index));
    }
    assert_eq!(held(&nav), slots_before);
    assert_eq!(nav.history().current_index(), 3);
    assert_eq!(nav.view().content, content_before);
    assert_eq!(nav.state(), NavState::Idle);
    let notice = nav.view().last_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.html.contains(&NavigatorConfig::default().messages.invalid_page));
}

#[test]
fn replay_requires_cached_menu() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "a.php", "m1", None);

    // Server references a menu this client never received.
    let Dispatch::Sent(id) = nav.request(Trigger::Link(LinkClick::new("b.php"))) else {
        panic!("request was not sent");
    };
    let envelope: ResponseEnvelope = serde_json::from_value(json!({
        "success": true,
        "message": "<h1>b</h1>",
        "_menuHash": "unknown",
        "_selflink": "b.php",
        "_scripts": [],
        "_params": {}
    }))
    .unwrap();
    nav.on_response(id, envelope);
    assert_eq!(nav.history().len(), 2);

    nav.navigate(0).unwrap();
    assert!(matches!(nav.navigate(1), Err(NavError::InvalidPage { index: 1 })));
    assert_eq!(nav.view().content, "<h1>a.php</h1>");
    assert_eq!(nav.history().current_index(), 1);
}

#[test]
fn edits_to_the_live_page_survive_leaving_it() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "a.php", "m1", None);
    nav.view_mut().content = "<h1>a.php</h1><p>expanded row</p>".into();
    visit(&mut nav, "b.php", "m2", None);

    nav.navigate(0).unwrap();
    assert_eq!(nav.view().content, "<h1>a.php</h1><p>expanded row</p>");
    assert_eq!(
        nav.history().get(0).map(|p| p.content_html.as_str()),
        Some("<h1>a.php</h1><p>expanded row</p>")
    );
}

#[test]
fn replay_while_scripts_load_waits_for_the_batch() {
    let mut nav = navigator(NavigatorConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let onload = Rc::clone(&log);
        let teardown = Rc::clone(&log);
        nav.events_mut()
            .register_onload("b.js", move |_| onload.borrow_mut().push("onload:b.js"))
            .register_teardown("b.js", move |_| teardown.borrow_mut().push("teardown:b.js"));
    }
    visit(&mut nav, "a.php", "m1", None);
    respond(
        &mut nav,
        "b.php",
        json!({
            "success": true,
            "message": "<h1>b.php</h1>",
            "_menu": "<ul>m2</ul>",
            "_menuHash": "m2",
            "_selflink": "b.php",
            "_scripts": [{"name": "b.js", "fire": 1}],
            "_params": {}
        }),
    );
    assert_eq!(nav.state(), NavState::Applying);
    let batch = nav.modules().batches.last().unwrap().id;

    assert!(matches!(nav.fragment_changed("#PMAURL-0:a.php"), Some(Ok(()))));
    assert_eq!(nav.pending_replay(), Some(0));
    assert_eq!(nav.view().content, "<h1>b.php</h1>");
    assert!(log.borrow().is_empty());

    assert!(nav.scripts_loaded(batch));
    assert_eq!(*log.borrow(), vec!["onload:b.js", "teardown:b.js"]);
    assert_eq!(nav.view().content, "<h1>a.php</h1>");
    assert_eq!(nav.history().current_index(), 1);
    assert_eq!(nav.pending_replay(), None);
    assert_eq!(nav.state(), NavState::Idle);
}

#[test]
fn reused_menu_stays_cached_while_its_page_is_held() {
    let mut nav = navigator(NavigatorConfig::default());
    nav.prime(Primer {
        url: "index.php".into(),
        scripts: Vec::new(),
        menu_key: "m0".into(),
        menu_html: "<ul>m0</ul>".into(),
    });
    for i in 1..=5 {
        visit(&mut nav, &format!("p{i}.php"), &format!("m{i}"), None);
    }
    // Known menu: the server sends only its key.
    respond(
        &mut nav,
        "reuse.php",
        json!({
            "success": true,
            "message": "<h1>reuse.php</h1>",
            "_menuHash": "m0",
            "_selflink": "reuse.php",
            "_scripts": [],
            "_params": {}
        }),
    );
    visit(&mut nav, "p6.php", "m6", None);

    let held_menus: Vec<(usize, String)> = held(&nav)
        .into_iter()
        .map(|(index, page)| (index, page.menu_key))
        .collect();
    assert_eq!(
        held_menus,
        vec![
            (2, "m2".to_string()),
            (3, "m3".to_string()),
            (4, "m4".to_string()),
            (5, "m5".to_string()),
            (6, "m0".to_string()),
            (7, "m6".to_string()),
        ]
    );
    assert_eq!(nav.menus().keys(), vec!["m2", "m3", "m4", "m5", "m0", "m6"]);
    nav.navigate(6).unwrap();
    assert_eq!(nav.view().content, "<h1>reuse.php</h1>");
    assert_eq!(nav.view().menu.as_deref(), Some("<ul>m0</ul>"));
}

#[test]
fn menus_of_held_pages_survive_eviction_after_back_and_forth() {
    let config = NavigatorConfig {
        page_capacity: 3,
        menu_capacity: 3,
        ..NavigatorConfig::default()
    };
    let mut nav = navigator(config);
    visit(&mut nav, "a.php", "m1", None);
    visit(&mut nav, "b.php", "m2", None);
    visit(&mut nav, "c.php", "m3", None);
    nav.navigate(0).unwrap();
    nav.navigate(2).unwrap();
    visit(&mut nav, "d.php", "m4", None);

    assert_eq!(nav.history().first_index(), 1);
    for (_, page) in held(&nav) {
        assert!(nav.menus().contains(&page.menu_key), "menu {} evicted", page.menu_key);
    }
    nav.navigate(1).unwrap();
    assert_eq!(nav.view().content, "<h1>b.php</h1>");
}

#[test]
fn user_fragment_change_replays_but_own_echo_does_not() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "a.php", "m1", None);
    visit(&mut nav, "b.php", "m2", None);
    assert_eq!(
        nav.view().fragment_writes,
        vec!["PMAURL-0:a.php".to_string(), "PMAURL-1:b.php".to_string()]
    );

    assert!(nav.fragment_changed("#PMAURL-1:b.php").is_none());
    assert!(matches!(nav.fragment_changed("#PMAURL-0:a.php"), Some(Ok(()))));
    assert_eq!(nav.view().content, "<h1>a.php</h1>");
    assert!(nav.fragment_changed("#section-2").is_none());
}

#[test]
fn replay_supersedes_request_in_flight() {
    let mut nav = navigator(NavigatorConfig::default());
    visit(&mut nav, "a.php", "m1", None);
    visit(&mut nav, "b.php", "m2", None);
    let Dispatch::Sent(id) = nav.request(Trigger::Link(LinkClick::new("c.php"))) else {
        panic!("request was not sent");
    };

    nav.navigate(0).unwrap();
    assert_eq!(nav.transport().aborted(), vec![id]);
    assert_eq!(nav.in_flight(), None);
    assert!(!nav.is_busy());
    assert_eq!(
        nav.on_response(id, ResponseEnvelope::default()),
        zenith_navigator::Applied::Ignored
    );
}

// ===========================================================================
// Startup deep links
// ===========================================================================

#[test]
fn allow_listed_deep_link_redirects() {
    let config = NavigatorConfig {
        redirect_allowlist: vec!["tbl_structure.php".into()],
        ..NavigatorConfig::default()
    };
    let mut nav = Navigator::new(
        config,
        MemoryViewPort::at("index.php#PMAURL-3:tbl_structure.php?db=a&table=t"),
        RecordingTransport::new(),
        RecordingRegistry::default(),
    )
    .unwrap();
    assert_eq!(
        nav.start(),
        Startup::Redirect("tbl_structure.php?db=a&table=t".into())
    );
    assert_eq!(nav.view().documents_loaded, vec!["tbl_structure.php?db=a&table=t".to_string()]);
}

#[test]
fn unlisted_deep_link_stays_put() {
    let mut nav = Navigator::new(
        NavigatorConfig::default(),
        MemoryViewPort::at("index.php#PMAURL-0:https://evil.example/?steal=1"),
        RecordingTransport::new(),
        RecordingRegistry::default(),
    )
    .unwrap();
    assert_eq!(nav.start(), Startup::Stay);
    assert!(nav.view().documents_loaded.is_empty());
}
