use tabula::*;

fn main() -> Result<()> {
    println!("Columnar Table Engine Demo\n");

    // Build an orders table column by column
    let mut orders = Table::new();
    orders.add_column(Column::from_values(
        "order_id",
        DataType::Int64,
        (1..=6).map(Value::Int64),
    )?)?;
    orders.add_column(Column::from_values(
        "customer",
        DataType::Int64,
        [10, 20, 10, 30, 20, 10].map(Value::Int64),
    )?)?;
    orders.add_column(Column::from_values(
        "amount",
        DataType::Float64,
        [
            Value::Float64(12.5),
            Value::Float64(40.0),
            Value::Null, // amount not yet known
            Value::Float64(7.25),
            Value::Float64(99.0),
            Value::Float64(3.0),
        ],
    )?)?;
    println!("Built 'orders' with {} rows\n", orders.row_count());

    // Print the raw table
    println!("{:<9} {:<9} {:<7}", "ORDER", "CUSTOMER", "AMOUNT");
    println!("{}", "-".repeat(27));
    for row in 0..orders.row_count() {
        println!(
            "{:<9} {:<9} {:<7}",
            orders.cell_as_string("order_id", row)?,
            orders.cell_as_string("customer", row)?,
            orders.cell_as_string("amount", row)?,
        );
    }
    println!();

    // Filter out the unknown amounts, group per customer, aggregate
    let summary = Query::new(&orders)
        .filter(|r| !r.is_null("amount").unwrap_or(true))?
        .group_by(&["customer"])?
        .aggregate(&[("amount", Reducer::Count), ("amount", Reducer::Sum)])?;

    println!("Per-customer summary:");
    println!("{:<9} {:<6} {:<10}", "CUSTOMER", "COUNT", "SUM");
    println!("{}", "-".repeat(27));
    for row in 0..summary.row_count() {
        println!(
            "{:<9} {:<6} {:<10}",
            summary.cell_as_string("customer", row)?,
            summary.cell_as_string("count", row)?,
            summary.cell_as_string("sum_amount", row)?,
        );
    }
    println!();

    // Join the summary back against a customer dimension table
    let mut customers = Table::new();
    customers.add_column(Column::from_values(
        "customer",
        DataType::Int64,
        [10, 20, 99].map(Value::Int64),
    )?)?;
    customers.add_column(Column::from_values(
        "name",
        DataType::Str,
        ["Alice", "Bob", "Nobody"].map(|s| Value::Str(s.into())),
    )?)?;

    let joined = Join::new(&summary)
        .with(&customers)
        .on(&["customer"])
        .kind(JoinKind::Left)
        .run()?;

    println!("Summary joined to customer names (left join):");
    for row in 0..joined.row_count() {
        println!(
            "  customer {} ({}) spent {}",
            joined.cell_as_string("customer", row)?,
            joined.cell_as_string("name", row)?,
            joined.cell_as_string("sum_amount", row)?,
        );
    }

    Ok(())
}
