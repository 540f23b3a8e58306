//! Raw-extract → staging pass: builds one wide table per business entity
//! by attaching foreign-key-referenced attributes under a column prefix.
//! No surrogate keys are minted here; that is the warehouse builder's job.

use crate::model::error::EtlError;
use crate::model::table::Table;
use crate::report::{Reporter, RunEvent, RunSummary};
use crate::storage::{CsvStore, WriteOutcome};

pub fn build_staging(
    raw: &CsvStore,
    staging: &CsvStore,
    reporter: &dyn Reporter,
) -> Result<RunSummary, EtlError> {
    staging.ensure_dir()?;

    let mut run = StagingRun {
        raw,
        staging,
        reporter,
        summary: RunSummary::default(),
    };
    run.execute();
    Ok(run.summary)
}

struct StagingRun<'a> {
    raw: &'a CsvStore,
    staging: &'a CsvStore,
    reporter: &'a dyn Reporter,
    summary: RunSummary,
}

impl StagingRun<'_> {

    fn execute(&mut self) {
        let channel = self.load("channel");
        let province = self.load("province");
        let product_category = self.load("product_category");
        let customer = self.load("customer");
        let address = self.load("address");
        let store = self.load("store");
        let product = self.load("product");
        let sales_order = self.load("sales_order");
        let sales_item = self.load("sales_order_item");
        let payment = self.load("payment");
        let shipment = self.load("shipment");
        let web_session = self.load("web_session");
        let nps = self.load("nps_response");

        let stg_address =
            address.left_join_prefixed(&province, "province_id", "province_id", "province_");
        self.save("stg_address", &stg_address);

        let stg_store = store.left_join_prefixed(&stg_address, "address_id", "address_id", "addr_");
        self.save("stg_store", &stg_store);

        // Categories join themselves to pull in the parent category's name.
        let stg_product_category =
            product_category.left_join_prefixed(&product_category, "parent_id", "category_id", "parent_");
        self.save("stg_product_category", &stg_product_category);

        let category_names = stg_product_category.select(&[
            ("category_id", "category_id"),
            ("name", "category_name"),
            ("parent_name", "parent_category_name"),
        ]);
        let stg_product = product.left_join_prefixed(&category_names, "category_id", "category_id", "");
        self.save("stg_product", &stg_product);

        self.save("stg_customer", &customer);
        self.save("stg_channel", &channel);
        self.save("stg_province", &province);

        let billing = stg_address.select(&[
            ("address_id", "billing_address_id"),
            ("city", "billing_city"),
            ("province_id", "billing_province_id"),
            ("province_name", "billing_province_name"),
        ]);
        let shipping = stg_address.select(&[
            ("address_id", "shipping_address_id"),
            ("city", "shipping_city"),
            ("province_id", "shipping_province_id"),
            ("province_name", "shipping_province_name"),
        ]);
        let stg_sales_order = sales_order
            .left_join_prefixed(&channel, "channel_id", "channel_id", "channel_")
            .left_join_prefixed(&customer, "customer_id", "customer_id", "cust_")
            .left_join_prefixed(&stg_store, "store_id", "store_id", "store_")
            .left_join_prefixed(&billing, "billing_address_id", "billing_address_id", "")
            .left_join_prefixed(&shipping, "shipping_address_id", "shipping_address_id", "");
        self.save("stg_sales_order", &stg_sales_order);

        let stg_sales_order_item = sales_item
            .left_join_prefixed(&stg_product, "product_id", "product_id", "prod_")
            .left_join_prefixed(&stg_sales_order, "order_id", "order_id", "ord_");
        self.save("stg_sales_order_item", &stg_sales_order_item);

        let stg_payment = payment.left_join_prefixed(&stg_sales_order, "order_id", "order_id", "ord_");
        self.save("stg_payment", &stg_payment);

        let stg_shipment =
            shipment.left_join_prefixed(&stg_sales_order, "order_id", "order_id", "ord_");
        self.save("stg_shipment", &stg_shipment);

        let stg_web_session =
            web_session.left_join_prefixed(&customer, "customer_id", "customer_id", "cust_");
        self.save("stg_web_session", &stg_web_session);

        let stg_nps = nps
            .left_join_prefixed(&channel, "channel_id", "channel_id", "channel_")
            .left_join_prefixed(&customer, "customer_id", "customer_id", "cust_");
        self.save("stg_nps_response", &stg_nps);
    }

    /// A missing raw file is an empty table; a malformed one fails only
    /// this entity's branch and the run carries on without it.
    fn load(&mut self, name: &str) -> Table {
        match self.raw.read_table(name) {
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

    fn save(&mut self, name: &str, table: &Table) {
        match self.staging.write_table(name, table) {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ConsoleReporter;

    fn write_csv(store: &CsvStore, name: &str, contents: &str) {
        std::fs::write(store.table_path(name), contents).unwrap();
    }

    fn stores() -> (tempfile::TempDir, CsvStore, CsvStore) {
        let scratch = tempfile::tempdir().unwrap();
        let raw = CsvStore::new(scratch.path().join("raw"));
        let staging = CsvStore::new(scratch.path().join("staging"));
        raw.ensure_dir().unwrap();
        (scratch, raw, staging)
    }

    #[test]
    fn addresses_are_enriched_with_province_attributes() {
        let (_scratch, raw, staging) = stores();
        write_csv(&raw, "province", "province_id,name,country_code\nP1,Ontario,CA\n");
        write_csv(
            &raw,
            "address",
            "address_id,line1,city,province_id,postal_code\nA1,1 Main St,Toronto,P1,M1M1M1\n",
        );

        let summary = build_staging(&raw, &staging, &ConsoleReporter).unwrap();
        assert!(summary.ok());

        let stg_address = staging.read_table("stg_address").unwrap();
        assert_eq!(stg_address.value(0, "province_name"), Some("Ontario"));
        assert_eq!(stg_address.value(0, "city"), Some("Toronto"));
    }

    #[test]
    fn missing_province_leaves_addresses_unenriched_but_written() {
        let (_scratch, raw, staging) = stores();
        write_csv(&raw, "address", "address_id,line1,city,province_id\nA1,1 Main St,Toronto,P1\n");

        let summary = build_staging(&raw, &staging, &ConsoleReporter).unwrap();
        assert!(summary.ok());

        let stg_address = staging.read_table("stg_address").unwrap();
        assert_eq!(stg_address.len(), 1);
        assert!(!stg_address.has_column("province_name"));
    }

    #[test]
    fn absent_entities_produce_no_staging_files() {
        let (_scratch, raw, staging) = stores();
        write_csv(&raw, "customer", "customer_id,name\nC1,Alice\n");

        let summary = build_staging(&raw, &staging, &ConsoleReporter).unwrap();
        assert!(summary.ok());

        assert!(staging.table_path("stg_customer").exists());
        assert!(!staging.table_path("stg_store").exists());
        assert!(!staging.table_path("stg_nps_response").exists());
    }

    #[test]
    fn malformed_raw_file_fails_only_its_branch() {
        let (_scratch, raw, staging) = stores();
        write_csv(&raw, "customer", "customer_id,name\nC1\n");
        write_csv(&raw, "channel", "channel_id,name\nCH1,Web\n");

        let summary = build_staging(&raw, &staging, &ConsoleReporter).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(!staging.table_path("stg_customer").exists());
        assert!(staging.table_path("stg_channel").exists());
    }

    #[test]
    fn category_parent_names_flow_into_products() {
        let (_scratch, raw, staging) = stores();
        write_csv(
            &raw,
            "product_category",
            "category_id,name,parent_id\nPC1,Electronics,\nPC2,Phones,PC1\n",
        );
        write_csv(&raw, "product", "product_id,name,category_id\nPR1,Phone X,PC2\n");

        build_staging(&raw, &staging, &ConsoleReporter).unwrap();

        let stg_product = staging.read_table("stg_product").unwrap();
        assert_eq!(stg_product.value(0, "category_name"), Some("Phones"));
        assert_eq!(stg_product.value(0, "parent_category_name"), Some("Electronics"));
    }
}
