use super::*;
use crate::classify::{ClassifierConfig, GroupRule};
use crate::error::Error;
use crate::models::{CostReport, DetailOrigin, FieldCost, GroupTotals};
use crate::test_utils::*;

const EPS: f64 = 1e-6;

fn classifier() -> Classifier {
    Classifier::with_config(ClassifierConfig::embedded().unwrap())
}

fn today() -> NaiveDate {
    date(2025, 3, 15)
}

fn season_filter() -> CostFilter {
    CostFilter {
        safra: Some("2024/2025".to_string()),
        ..Default::default()
    }
}

fn row<'r>(report: &'r CostReport, id: &str) -> &'r FieldCost {
    report.rows.iter().find(|r| r.field_id == id).unwrap()
}

fn two_fields() -> MemoryLedger {
    MemoryLedger {
        fields: vec![field("a", "Talhão A", 10.0), field("b", "Talhão B", 30.0)],
        ..Default::default()
    }
}

#[test]
fn test_line_cost_scale() {
    assert_eq!(LINE_COST_SCALE, 1e9);
    assert_eq!(line_cost(9_000_000_000), 9.0);
    assert_eq!(line_cost(1_500_000_000), 1.5);
    assert_eq!(line_cost(0), 0.0);
}

#[test]
fn test_area_shares() {
    let fields = vec![field("a", "A", 10.0), field("b", "B", 30.0)];
    let shares = AreaShares::new(&fields);
    assert_eq!(shares.total_area(), 40.0);
    assert_eq!(shares.fraction("a"), 0.25);
    assert_eq!(shares.fraction("zz"), 0.0);

    let split = shares.distribute(400.0);
    assert_eq!(split, vec![("a", 100.0), ("b", 300.0)]);

    let empty = AreaShares::new(&Vec::<Field>::new());
    assert!(empty.distribute(100.0).is_empty());
    assert_eq!(empty.fraction("a"), 0.0);
}

#[test]
fn test_cost_per_ha_guards_zero_area() {
    assert_eq!(cost_per_ha(100.0, 0.0), 0.0);
    assert_eq!(cost_per_ha(0.0, 0.0), 0.0);
    assert_eq!(cost_per_ha(100.0, 4.0), 25.0);
}

#[test]
fn test_unattributed_irrigation_split_by_area() {
    let mut ledger = two_fields();
    ledger.transactions.push(expense(
        "t1",
        -400.0,
        "Irrigação",
        "Conta de energia da bomba",
        "Fazenda Boa Vista",
        date(2024, 10, 1),
    ));
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert!((row(&report, "a").groups.operacional - 100.0).abs() < EPS);
    assert!((row(&report, "b").groups.operacional - 300.0).abs() < EPS);
    assert!((row(&report, "a").total - 100.0).abs() < EPS);
    assert!((row(&report, "a").cost_per_ha - 10.0).abs() < EPS);
}

#[test]
fn test_fixed_point_line_split_between_linked_fields() {
    let mut ledger = two_fields();
    ledger.activities.push(activity("act", "Adubação", date(2024, 9, 1)));
    ledger
        .usages
        .push(usage("act", "NPK", 200.0, "kg", 9_000_000_000));
    ledger.links.extend([link("act", "a"), link("act", "b")]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert!((row(&report, "a").groups.insumos - 4.5).abs() < EPS);
    assert!((row(&report, "b").groups.insumos - 4.5).abs() < EPS);
}

#[test]
fn test_exact_category_and_field_name_goes_to_one_field() {
    let mut ledger = two_fields();
    ledger.transactions.push(expense(
        "t1",
        250.0,
        "Seguro",
        "",
        "Talhão B",
        date(2024, 11, 1),
    ));
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert_eq!(row(&report, "b").groups.administrativos, 250.0);
    assert_eq!(row(&report, "a").groups.administrativos, 0.0);
    assert_eq!(row(&report, "a").total, 0.0);
}

#[test]
fn test_safra_window_edges() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("in", 40.0, "Transporte", "", "", date(2025, 4, 30)),
        expense("out", 4000.0, "Transporte", "", "", date(2025, 5, 1)),
        expense("before", 4000.0, "Transporte", "", "", date(2024, 4, 30)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert_eq!(report.period.from, "2024-05-01");
    assert_eq!(report.period.to, "2025-04-30");
    let total: f64 = report.rows.iter().map(|r| r.groups.servicos_logistica).sum();
    assert!((total - 40.0).abs() < EPS);
}

#[test]
fn test_month_beats_safra_and_default_is_current_season() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("mar", 100.0, "Transporte", "", "", date(2025, 3, 10)),
        expense("jan", 300.0, "Transporte", "", "", date(2025, 1, 10)),
        expense("old", 700.0, "Transporte", "", "", date(2023, 6, 10)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let filter = CostFilter {
        month: Some("2025-03".to_string()),
        safra: Some("2023/2024".to_string()),
        ..Default::default()
    };
    let report = allocator.cost_per_field(ACCOUNT, &filter, today()).unwrap();
    let total: f64 = report.rows.iter().map(|r| r.total).sum();
    assert!((total - 100.0).abs() < EPS);

    let report = allocator
        .cost_per_field(ACCOUNT, &CostFilter::default(), today())
        .unwrap();
    let total: f64 = report.rows.iter().map(|r| r.total).sum();
    assert!((total - 400.0).abs() < EPS);
}

#[test]
fn test_only_paid_expenses_count() {
    let mut ledger = two_fields();
    let mut pending = expense("p", 500.0, "Seguro", "", "Talhão A", date(2024, 9, 1));
    pending.status = crate::models::TransactionStatus::Pending;
    let mut income = expense("i", 500.0, "Seguro", "", "Talhão A", date(2024, 9, 1));
    income.kind = crate::models::TransactionKind::Income;
    ledger.transactions.extend([pending, income]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert!(report.rows.iter().all(|r| r.total == 0.0));
}

#[test]
fn test_unclassified_and_insumos_transactions_skipped() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("u", 999.0, "Pix", "transferência", "Talhão A", date(2024, 9, 1)),
        expense("f", 500.0, "Fertilizantes", "", "Talhão A", date(2024, 9, 1)),
    ]);
    let config = ClassifierConfig::embedded()
        .unwrap()
        .with_rule(MacroGroup::Insumos, GroupRule::new(["Fertilizantes"], ["adubo"]));
    let classifier = Classifier::with_config(config);
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert!(report.rows.iter().all(|r| r.total == 0.0));
}

#[test]
fn test_group_sums_are_conserved() {
    let mut ledger = MemoryLedger {
        fields: vec![
            field("a", "Talhão 1", 12.3),
            field("b", "Talhão 10", 4.7),
            field("c", "Baixada", 31.0),
        ],
        ..Default::default()
    };
    let samples = [
        ("Transporte", "", "talhao 10"),
        ("", "frete de cafe", ""),
        ("Seguro", "", "Baixada"),
        ("", "conserto do trator", "sede"),
        ("Outros", "", "Talhão 1"),
        ("Arrendamento", "", "morro"),
        ("Mão de obra", "", "baixada norte"),
        ("", "taxa sindical", ""),
    ];
    let mut expected = GroupTotals::default();
    let classifier = classifier();
    for (i, (category, description, linked)) in samples.iter().enumerate() {
        let amount = 17.31 * (i as f64 + 1.0) * if i % 2 == 0 { -1.0 } else { 1.0 };
        ledger.transactions.push(expense(
            &format!("t{}", i),
            amount,
            category,
            description,
            linked,
            date(2024, 6 + (i as u32 % 6), 3),
        ));
        let group = classifier.classify(category, description).unwrap();
        expected.add(group, amount.abs());
    }
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    for group in MacroGroup::COSTS {
        let allocated: f64 = report.rows.iter().map(|r| r.groups.get(group)).sum();
        assert!(
            (allocated - expected.get(group)).abs() < EPS,
            "{}: {} vs {}",
            group,
            allocated,
            expected.get(group)
        );
    }
}

#[test]
fn test_field_allow_list_and_property_filter() {
    let mut a = field("a", "Talhão A", 10.0);
    a.property_id = Some("p1".to_string());
    let mut b = field("b", "Talhão B", 30.0);
    b.property_id = Some("p2".to_string());
    let mut c = field("c", "Talhão C", 60.0);
    c.property_id = Some("p1".to_string());
    let mut ledger = MemoryLedger {
        fields: vec![a, b, c],
        ..Default::default()
    };
    ledger.transactions.push(expense(
        "t1",
        700.0,
        "Transporte",
        "",
        "",
        date(2024, 9, 1),
    ));
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let filter = CostFilter {
        property_id: Some("p1".to_string()),
        ..season_filter()
    };
    let report = allocator.cost_per_field(ACCOUNT, &filter, today()).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!((row(&report, "a").total - 100.0).abs() < EPS);
    assert!((row(&report, "c").total - 600.0).abs() < EPS);

    let filter = CostFilter {
        fields: vec!["b".to_string(), "talhao a".to_string()],
        ..season_filter()
    };
    let report = allocator.cost_per_field(ACCOUNT, &filter, today()).unwrap();
    let ids: Vec<&str> = report.rows.iter().map(|r| r.field_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!((row(&report, "b").total - 525.0).abs() < EPS);
}

#[test]
fn test_macro_group_filter() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("t1", 80.0, "Transporte", "", "Talhão A", date(2024, 9, 1)),
        expense("t2", 90.0, "Seguro", "", "Talhão A", date(2024, 9, 1)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let filter = CostFilter {
        macro_group: Some(MacroGroup::Administrativos),
        ..season_filter()
    };
    let report = allocator.cost_per_field(ACCOUNT, &filter, today()).unwrap();
    assert_eq!(row(&report, "a").groups.servicos_logistica, 0.0);
    assert_eq!(row(&report, "a").groups.administrativos, 90.0);
}

#[test]
fn test_ineligible_fields_never_appear() {
    let mut ledger = two_fields();
    let mut default_field = field("d", "Geral", 100.0);
    default_field.is_default = true;
    let mut inactive = field("i", "Antigo", 100.0);
    inactive.active = false;
    let zero = field("z", "Sem área", 0.0);
    ledger.fields.extend([default_field, inactive, zero]);
    ledger.transactions.push(expense(
        "t1",
        400.0,
        "Transporte",
        "",
        "Geral",
        date(2024, 9, 1),
    ));
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!((row(&report, "b").total - 300.0).abs() < EPS);
}

#[test]
fn test_transaction_failure_propagates() {
    let ledger = FailingLedger::new(two_fields(), &["transactions"]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let err = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap_err();
    assert!(matches!(err, Error::Source(_)));
}

#[test]
fn test_input_cost_failure_surfaces_as_warning() {
    let mut ledger = two_fields();
    ledger
        .activities
        .push(activity("act", "Adubação", date(2024, 9, 1)));
    ledger.transactions.push(expense(
        "t1",
        40.0,
        "Transporte",
        "",
        "",
        date(2024, 9, 1),
    ));
    let failing = FailingLedger::new(ledger, &["product_usages"]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&failing, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!((report.rows.iter().map(|r| r.total).sum::<f64>() - 40.0).abs() < EPS);
}

#[test]
fn test_invalid_filter_is_an_error() {
    let ledger = two_fields();
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let filter = CostFilter {
        safra: Some("2024".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        allocator.cost_per_field(ACCOUNT, &filter, today()),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn test_indicators() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("t1", 300.0, "Transporte", "", "", date(2024, 9, 1)),
        expense("t2", 100.0, "Seguro", "", "Talhão A", date(2024, 9, 1)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let indicators = allocator
        .indicators(ACCOUNT, &season_filter(), today())
        .unwrap();
    assert!((indicators.total_costs - 400.0).abs() < EPS);
    assert!((indicators.average_cost_per_ha - 10.0).abs() < EPS);
    let logistics = indicators
        .distribution
        .iter()
        .find(|g| g.group == MacroGroup::ServicosLogistica)
        .unwrap();
    assert!((logistics.percentage - 75.0).abs() < EPS);
}

fn detailed_ledger() -> MemoryLedger {
    let mut ledger = two_fields();
    ledger.activities.extend([
        activity("linked", "Adubação", date(2024, 9, 1)),
        activity("loose", "Pulverização", date(2024, 10, 5)),
    ]);
    ledger.usages.extend([
        usage("linked", "NPK", 200.0, "kg", 9_000_000_000),
        usage("loose", "Fungicida", 4.0, "L", 80_000_000_000),
    ]);
    ledger.links.extend([link("linked", "a"), link("linked", "b")]);
    ledger
        .movements
        .push(outflow(1, "Ureia", 40.0, date(2024, 12, 20)));
    ledger.transactions.extend([
        expense("t1", 400.0, "Irrigação", "Energia bomba", "", date(2025, 1, 10)),
        expense("t2", 250.0, "Seguro", "", "Talhão A", date(2024, 11, 1)),
        expense("t3", 99.0, "Transporte", "Frete", "Talhão B", date(2024, 11, 1)),
    ]);
    ledger
}

#[test]
fn test_details_add_up_to_report_row() {
    let ledger = detailed_ledger();
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let report = allocator
        .cost_per_field(ACCOUNT, &season_filter(), today())
        .unwrap();
    for id in ["a", "b"] {
        let details = allocator
            .field_details(ACCOUNT, id, &season_filter(), today())
            .unwrap();
        let sum: f64 = details.iter().map(|d| d.amount).sum();
        assert!(
            (sum - row(&report, id).total).abs() < EPS,
            "{}: {} vs {}",
            id,
            sum,
            row(&report, id).total
        );
    }
}

#[test]
fn test_details_content_and_order() {
    let ledger = detailed_ledger();
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let details = allocator
        .field_details(ACCOUNT, "a", &season_filter(), today())
        .unwrap();

    let dates: Vec<NaiveDate> = details.iter().map(|d| d.date).collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);

    assert_eq!(details[0].description, "Energia bomba - 25.00% da área");
    assert_eq!(details[0].origin, DetailOrigin::Financial);
    assert!((details[0].amount - 100.0).abs() < EPS);

    let stock = details
        .iter()
        .find(|d| d.origin == DetailOrigin::Stock)
        .unwrap();
    assert_eq!(stock.description, "Saída de Estoque - Ureia (25.00% da área)");
    assert!((stock.amount - 10.0).abs() < EPS);

    let linked = details
        .iter()
        .find(|d| d.description.starts_with("Adubação"))
        .unwrap();
    assert_eq!(linked.description, "Adubação - NPK (100 kg)");
    assert!((linked.amount - 4.5).abs() < EPS);

    let loose = details
        .iter()
        .find(|d| d.description.starts_with("Pulverização"))
        .unwrap();
    assert_eq!(loose.description, "Pulverização - Fungicida (4 L) - 25.00% da área");
    assert!((loose.amount - 20.0).abs() < EPS);

    // charged to the other field: not part of this one's details
    assert!(!details.iter().any(|d| d.description == "Frete"));

    let insurance = details.iter().find(|d| d.amount == 250.0).unwrap();
    assert_eq!(insurance.description, "Seguro");
    assert_eq!(insurance.category, "Administrativos");
    assert_eq!(insurance.display_date(), "01/11/2024");
}

#[test]
fn test_details_ties_keep_fetch_order() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("t1", 10.0, "Seguro", "primeiro", "Talhão A", date(2024, 9, 1)),
        expense("t2", 20.0, "Seguro", "segundo", "Talhão A", date(2024, 9, 1)),
        expense("t3", 30.0, "Seguro", "terceiro", "Talhão A", date(2024, 9, 1)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let details = allocator
        .field_details(ACCOUNT, "a", &season_filter(), today())
        .unwrap();
    let names: Vec<&str> = details.iter().map(|d| d.description.as_str()).collect();
    assert_eq!(names, vec!["primeiro", "segundo", "terceiro"]);
}

#[test]
fn test_details_unknown_field() {
    let ledger = two_fields();
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    assert!(matches!(
        allocator.field_details(ACCOUNT, "nope", &season_filter(), today()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_details_propagate_read_failures() {
    let failing = FailingLedger::new(detailed_ledger(), &["activity_fields"]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&failing, &classifier);

    assert!(allocator
        .field_details(ACCOUNT, "a", &season_filter(), today())
        .is_err());
}

#[test]
fn test_snapshot_includes_revenue_and_open_start() {
    let mut ledger = two_fields();
    ledger.transactions.extend([
        expense("r", 1000.0, "Receita", "", "Talhão A", date(2020, 1, 1)),
        expense("o", 400.0, "Irrigação", "", "", date(2024, 9, 1)),
        expense("late", 400.0, "Irrigação", "", "", date(2025, 6, 1)),
    ]);
    let classifier = classifier();
    let allocator = CostAllocator::new(&ledger, &classifier);

    let snapshot = allocator.snapshot(ACCOUNT, date(2025, 1, 1)).unwrap();
    let a = snapshot.iter().find(|s| s.field_id == "a").unwrap();
    let b = snapshot.iter().find(|s| s.field_id == "b").unwrap();
    assert_eq!(a.groups.receita, 1000.0);
    assert!((a.groups.operacional - 100.0).abs() < EPS);
    assert!((b.groups.operacional - 300.0).abs() < EPS);
    assert_eq!(a.groups.insumos, 0.0);
}
