//! Endpoint paths of the inventory backend.
//!
//! All paths are relative to the configured base URL. Parameterized paths
//! carry a literal `:id` placeholder, substituted by [`fill_id`] before the
//! request goes out.

/// Placeholder token substituted with an entity identifier.
pub const ID_PLACEHOLDER: &str = ":id";

/// CRUD paths for one backend collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Short name used on the command line and in log lines.
    pub name: &'static str,
    pub list: &'static str,
    pub add: &'static str,
    pub delete: &'static str,
    pub update: &'static str,
}

pub const UNITS: Resource = Resource {
    name: "unit",
    list: "/unit/getAll",
    add: "/unit/add",
    delete: "/unit/deleteById/:id",
    update: "/unit/updateById/:id",
};

pub const CATEGORIES: Resource = Resource {
    name: "category",
    list: "/category/getAll",
    add: "/category/add",
    delete: "/category/deleteById/:id",
    update: "/category/updateById/:id",
};

pub const USERS: Resource = Resource {
    name: "user",
    list: "/user/getAll",
    add: "/user/add",
    delete: "/user/deleteById/:id",
    update: "/user/updateById/:id",
};

pub const SUPPLIERS: Resource = Resource {
    name: "supplier",
    list: "/supplier/getAll",
    add: "/supplier/add",
    delete: "/supplier/deleteById/:id",
    update: "/supplier/updateById/:id",
};

pub const CUSTOMERS: Resource = Resource {
    name: "customer",
    list: "/customer/getAll",
    add: "/customer/add",
    delete: "/customer/deleteById/:id",
    update: "/customer/updateById/:id",
};

/// Product create/update also exist as multipart variants carrying the image.
pub const PRODUCTS: Resource = Resource {
    name: "product",
    list: "/product/getAll",
    add: "/product/add",
    delete: "/product/deleteById/:id",
    update: "/product/updateById/:id",
};

pub const ADMINS: Resource = Resource {
    name: "admin",
    list: "/admin/getAll",
    add: "/admin/add",
    delete: "/admin/deleteById/:id",
    update: "/admin/updateById/:id",
};

pub const SUBSCRIPTIONS: Resource = Resource {
    name: "subscription",
    list: "/subscription/getAll",
    add: "/subscription/add",
    delete: "/subscription/deleteById/:id",
    update: "/subscription/updateById/:id",
};

pub const EMPLOYEES: Resource = Resource {
    name: "employee",
    list: "/employee/getAll",
    add: "/employee/add",
    delete: "/employee/deleteById/:id",
    update: "/employee/updateById/:id",
};

/// Not reachable through the entity router; callers PATCH `update` themselves.
pub const ORDERS: Resource = Resource {
    name: "order",
    list: "/order/getAll",
    add: "/order/add",
    delete: "/order/deleteById/:id",
    update: "/order/updateById/:id",
};

pub const PURCHASES: Resource = Resource {
    name: "purchase",
    list: "/purchase/getAll",
    add: "/purchase/add",
    delete: "/purchase/deleteById/:id",
    update: "/purchase/updateById/:id",
};

/// Every collection the console manages.
pub const RESOURCES: &[Resource] = &[
    UNITS,
    CATEGORIES,
    USERS,
    SUPPLIERS,
    CUSTOMERS,
    PRODUCTS,
    ADMINS,
    SUBSCRIPTIONS,
    EMPLOYEES,
    ORDERS,
    PURCHASES,
];

pub const PRODUCT_ADD_WITH_IMAGE: &str = "/product/addWithImage";
pub const PRODUCT_IMAGE: &str = "/product/uploadImage/:id";
pub const DASHBOARD_SUMMARY: &str = "/dashboard/summary";
pub const SALES_REPORT: &str = "/report/sales";
pub const STOCK_REPORT: &str = "/report/stock";
pub const CURRENCY_SETTINGS: &str = "/settings/currency";
pub const CHAT_QUERY: &str = "/chat/query";

/// Look up a collection by its short name (`"unit"`, `"order"`, ...).
pub fn resource_by_name(name: &str) -> Option<&'static Resource> {
    RESOURCES.iter().find(|r| r.name == name)
}

/// Substitute the `:id` placeholder in `template` with `id`.
///
/// Only a whole `:id` token is replaced (`:identity` is left alone), only the
/// first one, and `id` is inserted verbatim. Templates without a placeholder
/// come back unchanged.
pub fn fill_id(template: &str, id: &str) -> String {
    let mut search_from = 0;
    while let Some(offset) = template[search_from..].find(ID_PLACEHOLDER) {
        let start = search_from + offset;
        let end = start + ID_PLACEHOLDER.len();
        let whole_token = template[end..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
        if whole_token {
            let mut filled = String::with_capacity(template.len() + id.len());
            filled.push_str(&template[..start]);
            filled.push_str(id);
            filled.push_str(&template[end..]);
            return filled;
        }
        search_from = end;
    }
    template.to_string()
}
