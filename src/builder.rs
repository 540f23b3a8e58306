//! Dimension/fact builder. Mints surrogate keys for every dimension,
//! materializes the dimension tables, and translates fact-table references
//! from natural keys to surrogate keys, including the order-level keys
//! that must be propagated into line items, payments and shipments, which
//! carry only the order's natural key.

use chrono::NaiveDate;

use crate::keys::{KeyMapping, KeyRegistry, OrderAssociations, OrderKeys, SurrogateKey};
use crate::model::error::EtlError;
use crate::model::schema::{self, DimensionSpec, FactSpec, Keep};
use crate::model::table::{Table, Value};
use crate::report::{Reporter, RunEvent, RunSummary};
use crate::storage::{CsvStore, WriteOutcome};

/// Runs the full staging → warehouse pass. Fails up front if the staging
/// directory does not exist; anything after that is per-entity.
pub fn build_warehouse(
    staging: &CsvStore,
    warehouse: &CsvStore,
    reporter: &dyn Reporter,
) -> Result<RunSummary, EtlError> {
    if !staging.exists() {
        return Err(EtlError::MissingDirectory(staging.dir().to_path_buf()));
    }
    warehouse.ensure_dir()?;

    let mut run = WarehouseRun {
        staging,
        warehouse,
        reporter,
        registry: KeyRegistry::new(),
        summary: RunSummary::default(),
    };
    run.execute();
    Ok(run.summary)
}

struct WarehouseRun<'a> {
    staging: &'a CsvStore,
    warehouse: &'a CsvStore,
    reporter: &'a dyn Reporter,
    registry: KeyRegistry,
    summary: RunSummary,
}

impl WarehouseRun<'_> {

    /// Dependency order: dimension mappings first, then the order pass
    /// (which registers the order mapping and yields the association
    /// index), and only then the facts that resolve through an order.
    fn execute(&mut self) {
        for spec in schema::DIMENSIONS {
            let table = self.load(spec.staging);
            self.materialize_dimension(&table, spec);
        }

        let orders = self.load(schema::ORDER_FACT.staging);
        let date_column = self.build_date_dimension(&orders);
        let associations = self.order_associations(&orders);
        self.materialize_fact(&orders, &schema::ORDER_FACT, None, date_column);

        for spec in schema::DEPENDENT_FACTS {
            let table = self.load(spec.staging);
            self.materialize_fact(&table, spec, Some(&associations), None);
        }

        for spec in schema::STANDALONE_FACTS {
            let table = self.load(spec.staging);
            self.materialize_fact(&table, spec, None, None);
        }
    }

    fn materialize_dimension(&mut self, table: &Table, spec: &DimensionSpec) -> Option<Table> {
        let distinct = table.dedup_by(spec.natural_key);
        let mapping = KeyMapping::build(distinct.column_values(spec.natural_key));
        let keys = mapping.resolve_many(distinct.column_values(spec.natural_key));
        // Registered even when empty, so facts resolve to null references
        // instead of tripping over an unknown entity.
        self.registry.insert(spec.entity, mapping);

        if distinct.is_empty() {
            self.skip(spec.output, "no data");
            return None;
        }

        let attributes: Vec<(String, String)> = match spec.keep {
            Keep::All => distinct
                .columns()
                .iter()
                .filter(|column| column.as_str() != spec.natural_key)
                .map(|column| (column.clone(), column.clone()))
                .collect(),
            Keep::Columns(columns) => columns
                .iter()
                .filter(|(source, _)| distinct.has_column(source))
                .map(|(source, output)| ((*source).to_string(), (*output).to_string()))
                .collect(),
        };

        let mut columns = vec![spec.surrogate.to_string(), schema::NATURAL_KEY_COLUMN.to_string()];
        columns.extend(attributes.iter().map(|(_, output)| output.clone()));

        let mut out = Table::new(columns);
        for row in 0..distinct.len() {
            let mut values: Vec<Value> = Vec::with_capacity(attributes.len() + 2);
            values.push(key_cell(keys[row]));
            values.push(distinct.value(row, spec.natural_key).map(str::to_string));
            for (source, _) in &attributes {
                values.push(distinct.value(row, source).map(str::to_string));
            }
            out.push_row(values);
        }

        self.write(spec.output, &out);
        Some(out)
    }

    /// Derives dim_date from the order table's timestamp column: distinct
    /// calendar dates, sorted ascending, keyed by sorted position. Returns
    /// the column the dates came from so the order fact can resolve its
    /// date reference against the same source.
    fn build_date_dimension(&mut self, orders: &Table) -> Option<&'static str> {
        if orders.is_empty() {
            self.skip(schema::DATE_OUTPUT, "no sales orders");
            return None;
        }
        let Some(column) = schema::ORDER_DATE_COLUMNS
            .iter()
            .copied()
            .find(|name| orders.has_column(name))
        else {
            self.skip(schema::DATE_OUTPUT, "no date column in sales orders");
            return None;
        };

        let mut dates: Vec<NaiveDate> = orders
            .column_values(column)
            .into_iter()
            .flatten()
            .filter_map(parse_date)
            .collect();
        dates.sort();
        dates.dedup();

        // Built over the sorted domain, so first-occurrence assignment and
        // sorted-position assignment coincide.
        let iso: Vec<String> = dates.iter().map(|date| date.format("%Y-%m-%d").to_string()).collect();
        let mapping = KeyMapping::build(iso.iter().map(|date| Some(date.as_str())));
        self.registry.insert(schema::DATE_ENTITY, mapping);

        let mut out = Table::new(vec![schema::DATE_SURROGATE.to_string(), "date".to_string()]);
        for (position, date) in iso.iter().enumerate() {
            out.push_row(vec![Some((position + 1).to_string()), Some(date.clone())]);
        }
        self.write(schema::DATE_OUTPUT, &out);
        Some(column)
    }

    /// Order natural key → resolved customer/channel/store keys, composed
    /// from the order reference columns and the dimension mappings already
    /// in the registry. Duplicate order ids keep their first resolution.
    fn order_associations(&self, orders: &Table) -> OrderAssociations {
        let mut associations = OrderAssociations::default();
        let Some((order_column, _)) = schema::ORDER_FACT.own_key else {
            return associations;
        };

        for row in 0..orders.len() {
            let Some(order_id) = orders.value(row, order_column) else {
                continue;
            };
            let keys = OrderKeys {
                customer: self.resolve_order_ref(orders, row, "customer"),
                channel: self.resolve_order_ref(orders, row, "channel"),
                store: self.resolve_order_ref(orders, row, "store"),
            };
            associations.insert(order_id, keys);
        }
        associations
    }

    fn resolve_order_ref(&self, orders: &Table, row: usize, entity: &str) -> Option<SurrogateKey> {
        let dim_ref = schema::ORDER_FACT
            .direct_refs
            .iter()
            .find(|dim_ref| dim_ref.entity == entity)?;
        self.registry.resolve(entity, orders.value(row, dim_ref.column))
    }

    /// Translates one staging table into its fact table. `associations`
    /// must be the index from the order pass for any spec carrying an
    /// `order_ref`; `date_column` only applies to the order fact itself.
    fn materialize_fact(
        &mut self,
        table: &Table,
        spec: &FactSpec,
        associations: Option<&OrderAssociations>,
        date_column: Option<&str>,
    ) -> Option<Table> {
        if table.is_empty() {
            self.skip(spec.output, "no data");
            if let Some(duplicate) = spec.duplicate_output {
                self.skip(duplicate, "no data");
            }
            return None;
        }

        // The fact's own keys are a fresh mapping, never shared with any
        // other table's. Registering it is what lets dependent facts
        // resolve their order_key.
        let own_column = spec.own_key.map(|(column, _)| column);
        let own_mapping = own_column.map(|column| KeyMapping::build(table.column_values(column)));
        if let Some(mapping) = &own_mapping {
            self.registry.insert(spec.entity, mapping.clone());
        }

        let measures: Vec<&str> = spec
            .measures
            .iter()
            .copied()
            .filter(|measure| table.has_column(measure))
            .collect();

        // Column contract: own key, order block, direct dimension refs,
        // date ref, then measures in source order. Natural-key columns do
        // not survive into fact output.
        let mut columns: Vec<String> = Vec::new();
        if let Some((_, output)) = spec.own_key {
            columns.push(output.to_string());
        }
        if spec.order_ref.is_some() {
            columns.push("order_key".to_string());
            columns.push("customer_key".to_string());
            columns.push("channel_key".to_string());
            columns.push("store_key".to_string());
        }
        for dim_ref in spec.direct_refs {
            columns.push(dim_ref.output.to_string());
        }
        if let Some(output) = spec.date_output {
            columns.push(output.to_string());
        }
        columns.extend(measures.iter().map(|measure| (*measure).to_string()));

        let mut out = Table::new(columns);
        for row in 0..table.len() {
            let mut values: Vec<Value> = Vec::new();
            if let (Some(column), Some(mapping)) = (own_column, &own_mapping) {
                values.push(key_cell(mapping.resolve(table.value(row, column))));
            }
            if let Some(order_column) = spec.order_ref {
                let order_id = table.value(row, order_column);
                values.push(key_cell(
                    self.registry.resolve(schema::ORDER_FACT.entity, order_id),
                ));
                let keys = associations.map(|index| index.get(order_id)).unwrap_or_default();
                values.push(key_cell(keys.customer));
                values.push(key_cell(keys.channel));
                values.push(key_cell(keys.store));
            }
            for dim_ref in spec.direct_refs {
                values.push(key_cell(
                    self.registry.resolve(dim_ref.entity, table.value(row, dim_ref.column)),
                ));
            }
            if spec.date_output.is_some() {
                let iso = date_column
                    .and_then(|column| table.value(row, column))
                    .and_then(parse_date)
                    .map(|date| date.format("%Y-%m-%d").to_string());
                values.push(key_cell(
                    self.registry.resolve(schema::DATE_ENTITY, iso.as_deref()),
                ));
            }
            for measure in &measures {
                values.push(table.value(row, measure).map(str::to_string));
            }
            out.push_row(values);
        }

        self.write(spec.output, &out);
        if let Some(duplicate) = spec.duplicate_output {
            self.write(duplicate, &out);
        }
        Some(out)
    }

    fn load(&mut self, name: &str) -> Table {
        match self.staging.read_table(name) {
            Ok(table) => table,
            Err(error) => {
                self.summary.failed += 1;
                self.reporter.report(&RunEvent::EntityFailed {
                    entity: name.to_string(),
                    error: error.to_string(),
                });
                Table::empty()
            }
        }
    }

    fn write(&mut self, name: &str, table: &Table) {
        match self.warehouse.write_table(name, table) {
            Ok(WriteOutcome::Written(rows)) => {
                self.summary.written += 1;
                self.reporter.report(&RunEvent::TableWritten {
                    table: name.to_string(),
                    rows,
                });
            }
            Ok(WriteOutcome::Skipped) => {
                self.summary.skipped += 1;
                self.reporter.report(&RunEvent::TableSkipped {
                    table: name.to_string(),
                    reason: "no data".to_string(),
                });
            }
            Err(error) => {
                self.summary.failed += 1;
                self.reporter.report(&RunEvent::EntityFailed {
                    entity: name.to_string(),
                    error: error.to_string(),
                });
            }
        }
    }

    fn skip(&mut self, name: &str, reason: &str) {
        self.summary.skipped += 1;
        self.reporter.report(&RunEvent::TableSkipped {
            table: name.to_string(),
            reason: reason.to_string(),
        });
    }
}

fn key_cell(key: Option<SurrogateKey>) -> Value {
    key.map(|k| k.to_string())
}

/// Lenient timestamp parsing: date-only, common datetime shapes, then
/// RFC 3339. Anything else coerces to null, mirroring how the staging
/// extract treats unparseable dates.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|datetime| datetime.date_naive())
}
