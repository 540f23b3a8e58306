//! Declarative descriptors for the warehouse tables. Materialization is
//! driven entirely by these, so per-entity differences live here as data
//! rather than as branching code in the builder.

/// Name of the retained business-identifier column in every dimension.
pub const NATURAL_KEY_COLUMN: &str = "natural_key";

/// How a dimension projects its descriptive attributes.
#[derive(Debug, Clone, Copy)]
pub enum Keep {
    /// Every staging column except the natural key, in source order.
    All,
    /// A fixed (source, output) keep-list; absent sources are skipped.
    Columns(&'static [(&'static str, &'static str)]),
}

#[derive(Debug, Clone, Copy)]
pub struct DimensionSpec {
    pub entity: &'static str,
    pub staging: &'static str,
    pub output: &'static str,
    pub natural_key: &'static str,
    pub surrogate: &'static str,
    pub keep: Keep,
}

/// A fact column resolved directly through one dimension's mapping.
#[derive(Debug, Clone, Copy)]
pub struct DimensionRef {
    pub column: &'static str,
    pub entity: &'static str,
    pub output: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FactSpec {
    pub entity: &'static str,
    pub staging: &'static str,
    pub output: &'static str,
    /// The fact's own natural id and the surrogate column minted for it.
    pub own_key: Option<(&'static str, &'static str)>,
    /// Column holding the parent order's natural key. Resolves to
    /// `order_key` plus the propagated customer/channel/store keys.
    pub order_ref: Option<&'static str>,
    pub direct_refs: &'static [DimensionRef],
    /// Output column keyed against the date dimension, if any.
    pub date_output: Option<&'static str>,
    /// Measure/attribute columns carried verbatim when present.
    pub measures: &'static [&'static str],
    /// Extra output written with identical content, kept for consumers of
    /// the historical duplicate table.
    pub duplicate_output: Option<&'static str>,
}

/// Dimensions in processing order; every entry must be materialized before
/// any fact resolves against it.
pub const DIMENSIONS: &[DimensionSpec] = &[
    DimensionSpec {
        entity: "customer",
        staging: "stg_customer",
        output: "dim_customer",
        natural_key: "customer_id",
        surrogate: "customer_key",
        keep: Keep::All,
    },
    DimensionSpec {
        entity: "product",
        staging: "stg_product",
        output: "dim_product",
        natural_key: "product_id",
        surrogate: "product_key",
        keep: Keep::Columns(&[
            ("name", "product_name"),
            ("category_name", "category_name"),
            ("parent_category_name", "parent_category_name"),
        ]),
    },
    DimensionSpec {
        entity: "channel",
        staging: "stg_channel",
        output: "dim_channel",
        natural_key: "channel_id",
        surrogate: "channel_key",
        keep: Keep::All,
    },
    DimensionSpec {
        entity: "store",
        staging: "stg_store",
        output: "dim_store",
        natural_key: "store_id",
        surrogate: "store_key",
        keep: Keep::All,
    },
    DimensionSpec {
        entity: "address",
        staging: "stg_address",
        output: "dim_address",
        natural_key: "address_id",
        surrogate: "address_key",
        keep: Keep::Columns(&[
            ("line1", "line1"),
            ("line2", "line2"),
            ("city", "city"),
            ("province_id", "province_id"),
            ("province_name", "province_name"),
            ("postal_code", "postal_code"),
            ("country_code", "country_code"),
        ]),
    },
];

pub const DATE_ENTITY: &str = "date";
pub const DATE_OUTPUT: &str = "dim_date";
pub const DATE_SURROGATE: &str = "date_key";

/// Candidate timestamp columns on the order table, probed in order.
pub const ORDER_DATE_COLUMNS: &[&str] = &["created_at", "order_date", "ord_created_at", "created"];

/// The order fact. Its own mapping doubles as the `order_key` lookup for
/// the dependent facts, and its rows feed the association index.
pub const ORDER_FACT: FactSpec = FactSpec {
    entity: "sales_order",
    staging: "stg_sales_order",
    output: "fact_sales_order",
    own_key: Some(("order_id", "order_key")),
    order_ref: None,
    direct_refs: &[
        DimensionRef {
            column: "customer_id",
            entity: "customer",
            output: "customer_key",
        },
        DimensionRef {
            column: "channel_id",
            entity: "channel",
            output: "channel_key",
        },
        DimensionRef {
            column: "store_id",
            entity: "store",
            output: "store_key",
        },
    ],
    date_output: Some(DATE_SURROGATE),
    measures: &["total_amount", "created_at", "order_date"],
    duplicate_output: None,
};

/// Facts that relate to customer/channel/store only through their parent
/// order. Materialized strictly after the order pass.
pub const DEPENDENT_FACTS: &[FactSpec] = &[
    FactSpec {
        entity: "sales_order_item",
        staging: "stg_sales_order_item",
        output: "fact_sales_order_item",
        own_key: Some(("order_item_id", "order_item_key")),
        order_ref: Some("order_id"),
        direct_refs: &[DimensionRef {
            column: "product_id",
            entity: "product",
            output: "product_key",
        }],
        date_output: None,
        measures: &["quantity", "unit_price"],
        duplicate_output: Some("fact_order_items"),
    },
    FactSpec {
        entity: "payment",
        staging: "stg_payment",
        output: "fact_payments",
        own_key: Some(("payment_id", "payment_key")),
        order_ref: Some("order_id"),
        direct_refs: &[],
        date_output: None,
        measures: &["amount", "created_at"],
        duplicate_output: None,
    },
    FactSpec {
        entity: "shipment",
        staging: "stg_shipment",
        output: "fact_shipments",
        own_key: Some(("shipment_id", "shipment_key")),
        order_ref: Some("order_id"),
        direct_refs: &[],
        date_output: None,
        measures: &["shipped_at", "delivered_at"],
        duplicate_output: None,
    },
];

/// Facts with direct dimension references only.
pub const STANDALONE_FACTS: &[FactSpec] = &[
    FactSpec {
        entity: "web_session",
        staging: "stg_web_session",
        output: "fact_web_sessions",
        own_key: Some(("session_id", "session_key")),
        order_ref: None,
        direct_refs: &[DimensionRef {
            column: "customer_id",
            entity: "customer",
            output: "customer_key",
        }],
        date_output: None,
        measures: &["started_at", "ended_at", "source", "device"],
        duplicate_output: None,
    },
    FactSpec {
        entity: "nps_response",
        staging: "stg_nps_response",
        output: "fact_nps",
        own_key: Some(("nps_id", "nps_key")),
        order_ref: None,
        direct_refs: &[
            DimensionRef {
                column: "customer_id",
                entity: "customer",
                output: "customer_key",
            },
            DimensionRef {
                column: "channel_id",
                entity: "channel",
                output: "channel_key",
            },
        ],
        date_output: None,
        measures: &["score", "responded_at"],
        duplicate_output: None,
    },
];
