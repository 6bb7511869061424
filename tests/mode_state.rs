//! Mode state machine scenarios driven through the engine.

mod common;

use common::{unplaced_ont, GatewayScript, ScriptedGateway};
use ont_console::engine::selection::Selection;
use ont_console::engine::{Engine, MapFilter, NoticeLevel};

fn engine_with(script: GatewayScript) -> (Engine, std::rc::Rc<std::cell::RefCell<GatewayScript>>) {
    let (gw, shared) = ScriptedGateway::new(script);
    (Engine::new(Box::new(gw)), shared)
}

#[tokio::test]
async fn at_most_one_selection_across_mode_switches() {
    let (mut engine, _script) = engine_with(GatewayScript::default());

    engine.select_for_placement("E1");
    assert_eq!(
        engine.state.selection,
        Selection::Placing {
            ont_id: "E1".into()
        }
    );

    // Picking another endpoint for association replaces the placement.
    engine.select_for_association("E2");
    assert_eq!(
        engine.state.selection,
        Selection::Associating {
            ont_id: "E2".into()
        }
    );

    engine.reset_selection();
    assert_eq!(engine.state.selection, Selection::Idle);
}

#[tokio::test]
async fn backlog_selection_enters_placement_and_syncs_filter() {
    let (mut engine, script) = engine_with(GatewayScript::default());

    engine.select_from_backlog("E42", "OLT-1", "PON-3");

    assert_eq!(
        engine.state.selection,
        Selection::Placing {
            ont_id: "E42".into()
        }
    );
    assert_eq!(
        engine.state.filter,
        Some(MapFilter {
            olt_id: "OLT-1".into(),
            pon_id: "PON-3".into(),
        })
    );
    // Selection and filter sync are purely local.
    assert!(script.borrow().log.is_empty());
}

#[tokio::test]
async fn map_click_outside_placement_mode_is_inert() {
    let (mut engine, script) = engine_with(GatewayScript::default());

    engine.map_clicked(40.0, -3.0).await;
    assert!(script.borrow().log.is_empty());

    // Association mode ignores bare map clicks too.
    engine.select_for_association("E1");
    engine.map_clicked(40.0, -3.0).await;
    assert!(script.borrow().log.is_empty());
    assert_eq!(
        engine.state.selection,
        Selection::Associating {
            ont_id: "E1".into()
        }
    );
}

#[tokio::test]
async fn cto_click_outside_association_mode_is_inert() {
    let (mut engine, script) = engine_with(GatewayScript::default());

    engine.cto_clicked("C9").await;
    assert!(script.borrow().log.is_empty());

    engine.select_for_placement("E1");
    engine.cto_clicked("C9").await;
    assert!(script.borrow().log.is_empty());
    assert_eq!(
        engine.state.selection,
        Selection::Placing {
            ont_id: "E1".into()
        }
    );
}

#[tokio::test]
async fn failed_placement_still_settles_to_idle_and_reconciles() {
    let mut script = GatewayScript::default();
    script.fail.insert("patch");
    let (mut engine, script) = engine_with(script);

    engine.select_for_placement("E42");
    engine.map_clicked(40.0, -3.0).await;

    assert_eq!(engine.state.selection, Selection::Idle);
    let notice = engine.last_notice().expect("failure notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.text.contains("place endpoint"));

    // Reconciliation ran despite the failure; no filter, so counts only.
    let script = script.borrow();
    assert_eq!(script.calls_matching("PATCH /onts/E42"), 1);
    assert_eq!(script.calls_matching("/ui/unlocated/groups"), 1);
    assert_eq!(script.calls_matching("/ui/onts/geo"), 0);
}

#[tokio::test]
async fn failed_association_settles_to_idle_without_retry() {
    let mut script = GatewayScript::default();
    script.fail.insert("patch");
    let (mut engine, script) = engine_with(script);

    engine.select_for_association("E7");
    engine.cto_clicked("C9").await;

    assert_eq!(engine.state.selection, Selection::Idle);
    assert_eq!(script.borrow().calls_matching("PATCH /onts/E7"), 1);
}

#[tokio::test]
async fn search_result_routing_depends_on_placement() {
    let mut unplaced = unplaced_ont("E5", "O1", "P1");
    unplaced.vendor_ont_id = "V-E5".into();
    let (mut engine, script) = engine_with(GatewayScript::default());

    // Unplaced result: enter placement mode, filter synced to its group.
    engine.open_search_result(&unplaced).await;
    assert_eq!(
        engine.state.selection,
        Selection::Placing {
            ont_id: "E5".into()
        }
    );
    assert_eq!(
        engine.state.filter,
        Some(MapFilter {
            olt_id: "O1".into(),
            pon_id: "P1".into(),
        })
    );
    assert_eq!(script.borrow().calls_matching("/ui/onts/geo"), 1);

    // A result with no group attribution cannot be routed.
    engine.reset_selection();
    let orphan = ont_console::model::Ont {
        id: "E6".into(),
        ..Default::default()
    };
    engine.open_search_result(&orphan).await;
    assert_eq!(engine.state.selection, Selection::Idle);
    assert_eq!(engine.last_notice().unwrap().level, NoticeLevel::Error);
}
