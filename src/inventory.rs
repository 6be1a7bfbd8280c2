//! This file defines the `Product` type and the pages and API routes for
//! managing a user's inventory. Stock at or below a product's minimum level
//! is flagged on the inventory page and the dashboard.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency_with,
    },
    navigation::NavBar,
    user::{UserID, get_user_by_id},
};

pub type ProductId = i64;

/// An item the user keeps in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// The ID of the product.
    pub id: ProductId,
    /// The user who stocks the product.
    pub user_id: UserID,
    /// The product name, unique within a user's inventory.
    pub name: String,
    /// How many units are currently in stock.
    pub stock_quantity: i64,
    /// The stock level at or below which the product is flagged.
    pub min_stock_level: i64,
    /// The selling price per unit.
    pub price: f64,
}

impl Product {
    /// Whether the stock has dropped to or below the minimum level.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

pub fn create_product_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            name TEXT NOT NULL,
            stock_quantity INTEGER NOT NULL DEFAULT 0,
            min_stock_level INTEGER NOT NULL DEFAULT 0,
            price REAL NOT NULL DEFAULT 0,
            UNIQUE(user_id, name)
        );",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Product, rusqlite::Error> {
    Ok(Product {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        stock_quantity: row.get(3)?,
        min_stock_level: row.get(4)?,
        price: row.get(5)?,
    })
}

/// The fields shared by the create and update forms.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub price: f64,
}

/// Add a product to the user's inventory.
///
/// # Errors
/// Returns [Error::EmptyProductName] for an empty name or
/// [Error::DuplicateProductName] if the user already stocks a product with
/// that name.
pub fn create_product(
    user_id: UserID,
    fields: ProductFields,
    connection: &Connection,
) -> Result<Product, Error> {
    let name = fields.name.trim().to_owned();

    if name.is_empty() {
        return Err(Error::EmptyProductName);
    }

    if product_name_taken(user_id, &name, None, connection)? {
        return Err(Error::DuplicateProductName);
    }

    connection.execute(
        "INSERT INTO product (user_id, name, stock_quantity, min_stock_level, price)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            user_id.as_i64(),
            &name,
            fields.stock_quantity,
            fields.min_stock_level,
            fields.price,
        ),
    )?;

    Ok(Product {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        stock_quantity: fields.stock_quantity,
        min_stock_level: fields.min_stock_level,
        price: fields.price,
    })
}

/// Whether another product of this user already uses `name`.
///
/// Pass the product being edited as `exclude` so renaming a product to its
/// own name is not flagged.
fn product_name_taken(
    user_id: UserID,
    name: &str,
    exclude: Option<ProductId>,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM product
        WHERE user_id = :user_id AND name = :name AND id != :exclude",
        rusqlite::named_params! {
            ":user_id": user_id.as_i64(),
            ":name": name,
            ":exclude": exclude.unwrap_or(-1),
        },
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

/// Get a product by ID, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the product does not exist or belongs to
/// another user.
pub fn get_product(
    product_id: ProductId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Product, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, stock_quantity, min_stock_level, price FROM product
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &product_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the user's inventory in name order.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_products(user_id: UserID, connection: &Connection) -> Result<Vec<Product>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, stock_quantity, min_stock_level, price FROM product
            WHERE user_id = :user_id ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_product| maybe_product.map_err(|error| error.into()))
        .collect()
}

/// Products whose stock is at or below their minimum level, in name order.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_low_stock_products(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Product>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, stock_quantity, min_stock_level, price FROM product
            WHERE user_id = :user_id AND stock_quantity <= min_stock_level ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_product| maybe_product.map_err(|error| error.into()))
        .collect()
}

/// Update a product's details.
///
/// # Errors
/// Returns [Error::EmptyProductName], [Error::DuplicateProductName], or
/// [Error::UpdateMissingProduct] if no product matches.
pub fn update_product(
    product_id: ProductId,
    user_id: UserID,
    fields: ProductFields,
    connection: &Connection,
) -> Result<(), Error> {
    let name = fields.name.trim().to_owned();

    if name.is_empty() {
        return Err(Error::EmptyProductName);
    }

    if product_name_taken(user_id, &name, Some(product_id), connection)? {
        return Err(Error::DuplicateProductName);
    }

    let rows_affected = connection.execute(
        "UPDATE product SET name = ?1, stock_quantity = ?2, min_stock_level = ?3, price = ?4
        WHERE id = ?5 AND user_id = ?6",
        (
            &name,
            fields.stock_quantity,
            fields.min_stock_level,
            fields.price,
            product_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingProduct);
    }

    Ok(())
}

/// Delete a product from the user's inventory.
///
/// # Errors
/// Returns [Error::DeleteMissingProduct] if no product matches.
pub fn delete_product(
    product_id: ProductId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM product WHERE id = ?1 AND user_id = ?2",
        (product_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingProduct);
    }

    Ok(())
}

/// The state needed for the inventory page and its endpoints.
#[derive(Debug, Clone)]
pub struct InventoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for InventoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductFormData {
    pub name: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub price: f64,
}

impl From<ProductFormData> for ProductFields {
    fn from(form_data: ProductFormData) -> Self {
        Self {
            name: form_data.name,
            stock_quantity: form_data.stock_quantity,
            min_stock_level: form_data.min_stock_level,
            price: form_data.price,
        }
    }
}

/// Display the inventory page for the logged-in user.
pub async fn get_inventory_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<InventoryState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let products = get_all_products(user_id, &connection)?;

    Ok(inventory_view(NavBar::new(endpoints::INVENTORY_VIEW), &user.currency, &products)
        .into_response())
}

/// A route handler for adding a product.
pub async fn create_product_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<InventoryState>,
    Form(form_data): Form<ProductFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_product(user_id, form_data.into(), &connection) {
        Ok(_) => (
            HxRedirect(endpoints::INVENTORY_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::EmptyProductName | Error::DuplicateProductName)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a product: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for updating a product.
pub async fn update_product_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(product_id): Path<ProductId>,
    State(state): State<InventoryState>,
    Form(form_data): Form<ProductFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_product(product_id, user_id, form_data.into(), &connection) {
        Ok(()) => (
            HxRedirect(endpoints::INVENTORY_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::EmptyProductName
            | Error::DuplicateProductName
            | Error::UpdateMissingProduct),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating product {product_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting a product.
pub async fn delete_product_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(product_id): Path<ProductId>,
    State(state): State<InventoryState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_product(product_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Product deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error @ Error::DeleteMissingProduct) => error.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting product {product_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn inventory_view(nav_bar: NavBar, currency: &str, products: &[Product]) -> Markup {
    let nav_bar = nav_bar.into_html();
    let low_stock_count = products.iter().filter(|product| product.is_low_stock()).count();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            (add_product_card())

            @if low_stock_count > 0 {
                div class="mt-8 p-4 rounded-lg border text-amber-800 border-amber-300 bg-amber-50
                    dark:bg-gray-800 dark:text-amber-400 dark:border-amber-800"
                {
                    (low_stock_count)
                    " product(s) are at or below their minimum stock level."
                }
            }

            section class="w-full mx-auto mt-8 mb-8"
            {
                h2 class="text-xl font-bold mb-4" { "Inventory" }

                div class="relative overflow-x-auto shadow-md rounded"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class="px-6 py-3" { "Product" }
                                th scope="col" class="px-6 py-3 text-right" { "In Stock" }
                                th scope="col" class="px-6 py-3 text-right" { "Min Level" }
                                th scope="col" class="px-6 py-3 text-right" { "Price" }
                                th scope="col" class="px-6 py-3" { "Actions" }
                            }
                        }

                        tbody
                        {
                            @if products.is_empty() {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td colspan="5" class="px-6 py-4 text-center"
                                    {
                                        "No products yet. Add your first product above."
                                    }
                                }
                            }

                            @for product in products {
                                (product_row(currency, product))
                            }
                        }
                    }
                }
            }
        }
    );

    base("Inventory", &[], &content)
}

fn add_product_card() -> Markup {
    html!(
        section class="w-full mx-auto"
        {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Add Product" }

                form
                    hx-post=(endpoints::POST_PRODUCT)
                    hx-target-error="#alert-container"
                    class="grid grid-cols-1 md:grid-cols-5 gap-4 items-end"
                {
                    div
                    {
                        label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                        input id="name" type="text" name="name" placeholder="e.g. Rice 5kg"
                            required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="stock_quantity" class=(FORM_LABEL_STYLE) { "In Stock" }
                        input id="stock_quantity" type="number" name="stock_quantity" min="0"
                            value="0" required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="min_stock_level" class=(FORM_LABEL_STYLE) { "Min Level" }
                        input id="min_stock_level" type="number" name="min_stock_level" min="0"
                            value="0" required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="price" class=(FORM_LABEL_STYLE) { "Price" }
                        input id="price" type="number" name="price" step="0.01" min="0"
                            value="0.00" required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Product" }
                }
            }
        }
    )
}

fn product_row(currency: &str, product: &Product) -> Markup {
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_PRODUCT, product.id);
    let delete_endpoint = endpoints::format_endpoint(endpoints::DELETE_PRODUCT, product.id);

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class="px-6 py-4 font-medium text-gray-900 dark:text-white"
            {
                (product.name)

                @if product.is_low_stock() {
                    span class="ms-2 text-xs font-bold text-amber-600 dark:text-amber-400"
                    {
                        "Low stock"
                    }
                }
            }

            td class="px-6 py-4 text-right" { (product.stock_quantity) }
            td class="px-6 py-4 text-right" { (product.min_stock_level) }
            td class="px-6 py-4 text-right" { (format_currency_with(currency, product.price)) }

            td class=(TABLE_CELL_STYLE)
            {
                details
                {
                    summary class=(LINK_STYLE) { "Edit" }

                    form
                        hx-put=(update_endpoint)
                        hx-target-error="#alert-container"
                        class="grid grid-cols-2 gap-2 mt-2 max-w-md"
                    {
                        input type="text" name="name" value=(product.name) required
                            class=(FORM_TEXT_INPUT_STYLE);
                        input type="number" name="stock_quantity" min="0"
                            value=(product.stock_quantity) required class=(FORM_TEXT_INPUT_STYLE);
                        input type="number" name="min_stock_level" min="0"
                            value=(product.min_stock_level) required class=(FORM_TEXT_INPUT_STYLE);
                        input type="number" name="price" step="0.01" min="0"
                            value=(format!("{:.2}", product.price)) required
                            class=(FORM_TEXT_INPUT_STYLE);

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }

                        button
                            type="button"
                            hx-delete=(delete_endpoint)
                            hx-confirm=(format!("Delete \"{}\" from your inventory?", product.name))
                            hx-target-error="#alert-container"
                            class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete"
                        }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod product_query_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, user::UserID};

    use super::{
        ProductFields, create_product, delete_product, get_all_products, get_low_stock_products,
        get_product, update_product,
    };

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    fn fields(name: &str, stock: i64, min_level: i64) -> ProductFields {
        ProductFields {
            name: name.to_owned(),
            stock_quantity: stock,
            min_stock_level: min_level,
            price: 100.0,
        }
    }

    #[test]
    fn create_product_round_trips() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let product = create_product(user_id, fields("Rice 5kg", 20, 5), &connection).unwrap();

        assert!(product.id > 0);
        assert_eq!(Ok(product), get_product(1, user_id, &connection));
    }

    #[test]
    fn create_product_rejects_duplicates_per_user() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        create_product(user_id, fields("Rice 5kg", 20, 5), &connection).unwrap();

        let result = create_product(user_id, fields("Rice 5kg", 3, 1), &connection);

        assert_eq!(result, Err(Error::DuplicateProductName));

        // A different user may use the same name.
        assert!(create_product(UserID::new(2), fields("Rice 5kg", 3, 1), &connection).is_ok());
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let connection = get_db_connection();

        let result = create_product(UserID::new(1), fields("  ", 1, 1), &connection);

        assert_eq!(result, Err(Error::EmptyProductName));
    }

    #[test]
    fn update_product_allows_keeping_its_own_name() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        let product = create_product(user_id, fields("Rice 5kg", 20, 5), &connection).unwrap();

        let result = update_product(product.id, user_id, fields("Rice 5kg", 15, 5), &connection);

        assert!(result.is_ok());
        assert_eq!(
            get_product(product.id, user_id, &connection).unwrap().stock_quantity,
            15
        );
    }

    #[test]
    fn update_product_rejects_taking_anothers_name() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        create_product(user_id, fields("Rice 5kg", 20, 5), &connection).unwrap();
        let other = create_product(user_id, fields("Cooking oil", 10, 2), &connection).unwrap();

        let result = update_product(other.id, user_id, fields("Rice 5kg", 10, 2), &connection);

        assert_eq!(result, Err(Error::DuplicateProductName));
    }

    #[test]
    fn low_stock_products_are_flagged() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        create_product(user_id, fields("Plenty", 20, 5), &connection).unwrap();
        create_product(user_id, fields("At minimum", 5, 5), &connection).unwrap();
        create_product(user_id, fields("Below minimum", 1, 5), &connection).unwrap();

        let low_stock = get_low_stock_products(user_id, &connection).unwrap();

        let names: Vec<&str> = low_stock.iter().map(|product| product.name.as_str()).collect();
        assert_eq!(names, vec!["At minimum", "Below minimum"]);
        assert!(low_stock.iter().all(|product| product.is_low_stock()));
    }

    #[test]
    fn delete_product_is_scoped_to_owner() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let product = create_product(owner, fields("Rice 5kg", 20, 5), &connection).unwrap();

        assert_eq!(
            delete_product(product.id, UserID::new(2), &connection),
            Err(Error::DeleteMissingProduct)
        );
        assert!(delete_product(product.id, owner, &connection).is_ok());
        assert!(get_all_products(owner, &connection).unwrap().is_empty());
    }
}
