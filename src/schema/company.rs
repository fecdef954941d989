use super::{FieldKind, FieldSpec, Schema};

const TRI_STATE: &[&str] = &["true", "false", "unknown"];

/// Built-in company profile schema
pub fn company_schema() -> Schema {
    use FieldKind::*;

    Schema::new(vec![
        FieldSpec::new(
            "under_maintenance",
            Boolean,
            "Is the website currently under maintenance, unavailable, unresponsive or unreachable? Return 'true' or 'false'",
        )
        .with_allowed(&["true", "false"])
        .with_alias("is_working", true),
        FieldSpec::new(
            "early_access",
            Boolean,
            "Is the website in early access mode, for example a coming soon page or a beta? Return 'true', 'false', or 'unknown'",
        )
        .with_allowed(TRI_STATE)
        .with_alias("is_launched", true),
        FieldSpec::new(
            "language",
            Text,
            "Primary language of the website as an ISO code (e.g. 'en')",
        ),
        FieldSpec::new(
            "capital_intensive_business",
            Boolean,
            "Does the company operate in a capital-intensive industry (manufacturing, mining, infrastructure, chemistry, pharmaceuticals, biotech)? Return 'true', 'false', or 'unknown'",
        )
        .with_allowed(TRI_STATE)
        .with_alias("is_capital_intensive", false),
        FieldSpec::new(
            "people_based_service",
            Boolean,
            "Is the product primarily people: professional judgment, skills or personal service rather than goods or software? Return 'true', 'false', or 'unknown'",
        )
        .with_allowed(TRI_STATE)
        .with_alias("is_people_based_service", false),
        FieldSpec::new(
            "product_category",
            Enum,
            "Primary product category of the company",
        )
        .with_allowed(&["non-profit", "B2B", "B2C", "SMB", "unknown"]),
        FieldSpec::new(
            "operation_country",
            List,
            "Countries where the company operates, as ISO codes",
        ),
        FieldSpec::new(
            "main_product_type",
            Text,
            "Main type of product or service, such as 'SaaS platform' or 'consulting services'",
        ),
        FieldSpec::new(
            "pricing_information",
            Text,
            "How the product is priced and which pricing tiers or models exist",
        ),
        FieldSpec::new(
            "starting_price",
            Currency,
            "Lowest advertised paid price including currency, e.g. '$29'",
        ),
        FieldSpec::new(
            "industries",
            List,
            "Industries or product delivery methods the company operates in",
        ),
        FieldSpec::new(
            "key_features",
            List,
            "Key features or functionalities of the product or service",
        ),
        FieldSpec::new(
            "used_by",
            List,
            "Notable companies or clients using the product, if mentioned",
        ),
        FieldSpec::new(
            "number_of_employees",
            Text,
            "Number of people working at the company, as a number or range like '10-50'",
        ),
        FieldSpec::new(
            "featured_in",
            List,
            "Media outlets where the company has been featured ('As seen in')",
        )
        .with_alias("Featured_in", false),
        FieldSpec::new(
            "press_releases",
            List,
            "Press releases produced by the company itself",
        )
        .with_alias("Press_releases", false),
        FieldSpec::new(
            "backing_funds",
            List,
            "Venture capital firms, investors or funds backing the company",
        ),
        FieldSpec::new(
            "patents",
            Text,
            "Number of patents the company holds, if mentioned",
        )
        .with_alias("Patents", false),
        FieldSpec::new(
            "customers_served",
            Text,
            "How many customers or units the company has served, e.g. '10,000+ customers'",
        ),
        FieldSpec::new("competitors", List, "Competitors mentioned on the website")
            .with_alias("Competitors", false),
        FieldSpec::new(
            "conferences",
            List,
            "Past or future conference participation mentioned on the website",
        )
        .with_alias("conferences_attendance", false),
        FieldSpec::new("phone", Phone, "Main contact phone number"),
        FieldSpec::new("email", Email, "Main contact email address"),
        FieldSpec::new("website", Url, "Canonical website URL of the company"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_unique() {
        let schema = company_schema();
        let names: HashSet<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names.len(), schema.len());
    }

    #[test]
    fn test_enum_fields_declare_allowed_values() {
        for field in company_schema().fields() {
            if field.kind == FieldKind::Enum || field.kind == FieldKind::Boolean {
                assert!(
                    !field.allowed.is_empty(),
                    "{} has no allowed values",
                    field.name
                );
            }
        }
    }
}
