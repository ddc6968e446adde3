//! End-to-end pipeline tests: CSV or workbook fixture → table → writer → in-memory graph.

mod helpers;

use infragraph_rs::driver::memory::MemoryGraph;
use infragraph_rs::edges::RelType;
use infragraph_rs::nodes::NodeLabel;
use infragraph_rs::pipeline::Phase;
use infragraph_rs::record::Cell;
use infragraph_rs::{IngestError, StatementKind, StoreError, Writer, WriterConfig};

use helpers::{TempTable, SCENARIO_HEADERS, SCENARIO_ROW};

fn writer_config() -> WriterConfig {
    WriterConfig {
        retry_max_elapsed_secs: 0,
        ..WriterConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_row_builds_full_neighbourhood() {
    let fixture = TempTable::new();
    fixture.write(&SCENARIO_HEADERS, &[&SCENARIO_ROW]);
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let summary = Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    assert!(graph.has_node(NodeLabel::Server, "srv1"));
    assert!(graph.has_node(NodeLabel::Product, "prodA"));
    assert!(graph.has_node(NodeLabel::ProductOwner, "alice"));
    assert!(graph.has_node(NodeLabel::Vpc, "vpc-9"));
    assert!(graph.has_node(NodeLabel::SecurityGroup, "sg-1"));
    assert!(graph.has_node(NodeLabel::SecurityGroup, "sg-2"));
    assert_eq!(graph.total_nodes(), 6);

    assert!(graph.has_edge(RelType::Runs, "srv1", "prodA"));
    assert!(graph.has_edge(RelType::OwnedBy, "srv1", "alice"));
    assert!(graph.has_edge(RelType::PartOfVpc, "srv1", "vpc-9"));
    assert!(graph.has_edge(RelType::UsesSecurityGroup, "srv1", "sg-1"));
    assert!(graph.has_edge(RelType::UsesSecurityGroup, "srv1", "sg-2"));
    assert_eq!(graph.total_edges(), 5);

    assert!(!summary.has_failures());
    let team = summary.statement(StatementKind::CreateProductTeam).unwrap();
    assert_eq!(team.written, 0);
    assert_eq!(team.skipped_invalid, 1);
}

#[tokio::test]
async fn test_rerun_creates_no_duplicates() {
    let fixture = TempTable::new();
    fixture.write(
        &SCENARIO_HEADERS,
        &[&SCENARIO_ROW, &["srv2", "prodA", "bob", "vpc-9", "[sg-2]"]],
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let writer = Writer::new(&graph, writer_config());
    writer.write_all(&table.records).await;
    let nodes = graph.total_nodes();
    let edges = graph.total_edges();

    let second = writer.write_all(&table.records).await;
    assert_eq!(graph.total_nodes(), nodes);
    assert_eq!(graph.total_edges(), edges);
    assert_eq!(graph.node_count(NodeLabel::Product), 1);
    assert_eq!(graph.node_count(NodeLabel::SecurityGroup), 2);
    assert!(!second.has_failures());
}

#[tokio::test]
async fn test_servers_without_relationships_are_still_created() {
    let fixture = TempTable::new();
    fixture.write(
        &["Servers", "State", "Region", "Product"],
        &[&["srv1", "running", "eu-west-1", ""], &["", "stopped", "", "prodB"]],
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let summary = Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    assert!(graph.has_node(NodeLabel::Server, "srv1"));
    assert_eq!(
        graph.node_property(NodeLabel::Server, "srv1", "region"),
        Some(Cell::from("eu-west-1"))
    );
    assert_eq!(graph.node_count(NodeLabel::Server), 1);
    assert!(graph.has_node(NodeLabel::Product, "prodB"));
    assert_eq!(graph.edge_count(RelType::Runs), 0);

    let server = summary.statement(StatementKind::CreateServer).unwrap();
    assert_eq!(server.written, 1);
    assert_eq!(server.skipped_invalid, 1);
}

// ---------------------------------------------------------------------------
// Ordering and failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_no_relationship_runs_before_node_phase_completes() {
    let fixture = TempTable::new();
    let rows: Vec<Vec<String>> = (0..25)
        .map(|i| {
            vec![
                format!("srv{i}"),
                format!("prod{}", i % 3),
                "alice".to_string(),
                format!("vpc-{}", i % 2),
                format!("[sg-{i} sg-shared]"),
            ]
        })
        .collect();
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
    let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
    fixture.write(&SCENARIO_HEADERS, &rows);
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let config = WriterConfig {
        batch_size: 4,
        batch_concurrency: 3,
        ..writer_config()
    };
    let summary = Writer::new(&graph, config).write_all(&table.records).await;

    let journal = graph.journal();
    let phase_of = |kind: StatementKind| {
        summary
            .statement(kind)
            .map(|s| s.phase)
            .expect("statement in summary")
    };
    let first_rel = journal
        .iter()
        .position(|e| phase_of(e.statement) == Phase::Relationships)
        .expect("relationships ran");
    assert!(journal[..first_rel]
        .iter()
        .all(|e| phase_of(e.statement) == Phase::Nodes));
    assert!(journal[first_rel..]
        .iter()
        .all(|e| phase_of(e.statement) == Phase::Relationships));

    assert_eq!(graph.edge_count(RelType::UsesSecurityGroup), 50);
    assert_eq!(graph.node_count(NodeLabel::SecurityGroup), 26);
    assert_eq!(summary.statement(StatementKind::CreateServer).unwrap().batches, 7);
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_the_run() {
    let fixture = TempTable::new();
    fixture.write(
        &["Servers", "Product"],
        &[
            &["srv1", "prodA"],
            &["srv2", "prodB"],
            &["srv3", "prodC"],
        ],
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    graph.fail_on(
        StatementKind::CreateProduct,
        2,
        StoreError::Rejected("constraint violation".into()),
    );
    let config = WriterConfig {
        batch_size: 1,
        ..writer_config()
    };
    let summary = Writer::new(&graph, config).write_all(&table.records).await;

    let product = summary.statement(StatementKind::CreateProduct).unwrap();
    assert_eq!(product.written, 2);
    assert_eq!(product.skipped_failed, 1);
    assert_eq!(product.failed_batches, 1);

    // Later statements still ran; the missing product only costs its own edge.
    assert!(!graph.has_node(NodeLabel::Product, "prodB"));
    assert!(graph.has_edge(RelType::Runs, "srv1", "prodA"));
    assert!(!graph.has_edge(RelType::Runs, "srv2", "prodB"));
    assert!(graph.has_edge(RelType::Runs, "srv3", "prodC"));
    assert_eq!(summary.failed_batches(), 1);

    let runs = summary.statement(StatementKind::ServerRunsProduct).unwrap();
    assert_eq!(runs.written, 3);
}

#[tokio::test]
async fn test_rerun_fills_gaps_left_by_failures() {
    let fixture = TempTable::new();
    fixture.write(&SCENARIO_HEADERS, &[&SCENARIO_ROW]);
    let table = fixture.load();

    let graph = MemoryGraph::new();
    graph.fail_on(
        StatementKind::CreateVpc,
        1,
        StoreError::Transient("connection reset".into()),
    );
    let writer = Writer::new(&graph, writer_config());

    let first = writer.write_all(&table.records).await;
    assert!(first.has_failures());
    assert!(!graph.has_edge(RelType::PartOfVpc, "srv1", "vpc-9"));

    let second = writer.write_all(&table.records).await;
    assert!(!second.has_failures());
    assert!(graph.has_edge(RelType::PartOfVpc, "srv1", "vpc-9"));
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_security_group_column_skips_group_statements() {
    let fixture = TempTable::new();
    fixture.write(&["Servers", "Product"], &[&["srv1", "prodA"]]);
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let summary = Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    for kind in [
        StatementKind::CreateSecurityGroups,
        StatementKind::ServerUsesSecurityGroup,
    ] {
        let s = summary.statement(kind).unwrap();
        assert_eq!(s.written, 0);
        assert_eq!(s.skipped_invalid, 1);
    }
    assert_eq!(graph.node_count(NodeLabel::SecurityGroup), 0);
}

#[tokio::test]
async fn test_null_vpc_tokens_are_excluded() {
    let fixture = TempTable::new();
    fixture.write(
        &["Servers", "VPC_ID"],
        &[&["srv1", "vpc-1"], &["srv2", "null"], &["srv3", ""], &["srv4", "None"]],
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    let summary = Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    let vpc = summary.statement(StatementKind::CreateVpc).unwrap();
    assert_eq!(vpc.written, 1);
    assert_eq!(vpc.excluded, 3);
    assert_eq!(graph.node_count(NodeLabel::Vpc), 1);
    assert_eq!(graph.edge_count(RelType::PartOfVpc), 1);
}

#[test]
fn test_missing_servers_column_is_fatal() {
    let fixture = TempTable::new();
    fixture.write(&["Product", "Product_Owner"], &[&["prodA", "alice"]]);

    let err = infragraph_rs::table::load_csv(&fixture.path).unwrap_err();
    assert!(matches!(err, IngestError::MissingColumns(ref cols) if cols == &["Servers"]));
}

#[test]
fn test_unreadable_input_is_an_io_error() {
    let fixture = TempTable::new();
    let err = infragraph_rs::table::load_csv(&fixture.path).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}

#[tokio::test]
async fn test_messy_headers_and_numeric_keys() {
    let fixture = TempTable::new();
    fixture.write_raw(
        " Servers ,Tag: product_team,Product,Supporting Product Owner\n\
         1001,platform,prodA,carol\n",
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    assert!(graph.has_node(NodeLabel::Server, "1001"));
    assert!(graph.has_node(NodeLabel::ProductTeam, "platform"));
    assert!(graph.has_node(NodeLabel::ProductOwner, "carol"));
    assert!(graph.has_edge(RelType::BelongsToTeam, "prodA", "platform"));
    assert!(graph.has_edge(RelType::SupportedBy, "prodA", "carol"));
}

#[tokio::test]
async fn test_numeric_looking_keys_stay_distinct() {
    let fixture = TempTable::new();
    fixture.write(
        &["Servers", "Product", "Tag_aws_ec2launchtemplate_version"],
        &[
            &["007", "1e3", "1.10"],
            &["7", "1000", "1.1"],
            &["1.0", "nan", ""],
            &["1", "", ""],
        ],
    );
    let table = fixture.load();

    let graph = MemoryGraph::new();
    Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    assert_eq!(graph.node_count(NodeLabel::Server), 4);
    for key in ["007", "7", "1.0", "1"] {
        assert!(graph.has_node(NodeLabel::Server, key), "missing server {key}");
    }
    assert_eq!(graph.node_count(NodeLabel::Product), 3);
    assert!(graph.has_node(NodeLabel::Product, "1e3"));
    assert!(graph.has_node(NodeLabel::Product, "1000"));
    assert!(graph.has_node(NodeLabel::Product, "nan"));
    assert_eq!(
        graph.node_property(NodeLabel::Server, "007", "launch_template_version"),
        Some(Cell::from("1.10"))
    );
}

// ---------------------------------------------------------------------------
// Workbook input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_workbook_input_builds_the_same_graph() {
    let fixture = TempTable::new();
    let path = fixture.write_xlsx(
        &SCENARIO_HEADERS,
        &[&SCENARIO_ROW, &["1001", "prodA", "bob", "", "[sg-2]"]],
    );
    let table = infragraph_rs::table::load(&path).expect("load workbook");
    assert_eq!(table.len(), 2);

    let graph = MemoryGraph::new();
    let summary = Writer::new(&graph, writer_config())
        .write_all(&table.records)
        .await;

    assert!(!summary.has_failures());
    assert!(graph.has_node(NodeLabel::Server, "srv1"));
    assert!(graph.has_node(NodeLabel::Server, "1001"));
    assert!(graph.has_edge(RelType::Runs, "1001", "prodA"));
    assert!(graph.has_edge(RelType::OwnedBy, "1001", "bob"));
    assert!(graph.has_edge(RelType::UsesSecurityGroup, "1001", "sg-2"));
    assert!(graph.has_edge(RelType::PartOfVpc, "srv1", "vpc-9"));
    assert_eq!(graph.edge_count(RelType::PartOfVpc), 1);
}

#[test]
fn test_workbook_without_servers_column_is_fatal() {
    let fixture = TempTable::new();
    let path = fixture.write_xlsx(&["Product"], &[&["prodA"]]);

    let err = infragraph_rs::table::load(&path).unwrap_err();
    assert!(matches!(err, IngestError::MissingColumns(ref cols) if cols == &["Servers"]));
}

#[test]
fn test_unreadable_workbook_is_a_workbook_error() {
    let fixture = TempTable::new();
    let path = fixture.dir.path().join("broken.xlsx");
    std::fs::write(&path, "not a zip archive").expect("write broken workbook");

    let err = infragraph_rs::table::load(&path).unwrap_err();
    assert!(matches!(err, IngestError::Workbook(_)));
}
