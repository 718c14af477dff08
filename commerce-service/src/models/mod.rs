//! Data models for commerce-service.

pub mod cart;
pub mod invoice;
pub mod party;
pub mod pricing_plan;
pub mod product;

pub use cart::{AddCartItem, Cart, CartItem, CartLine, CartView, UpdateCartItem};
pub use invoice::{
    CreateInvoice, CreateInvoiceItem, Invoice, InvoiceConfirmation, InvoiceItem, InvoicePage,
    InvoiceStatus, InvoiceSummary, InvoiceView, ListInvoicesFilter,
};
pub use party::{Company, CreateCompany, CreateCustomer, Customer};
pub use pricing_plan::{NewPricingPlan, PricingPlan, PricingPlanView};
pub use product::{CreateProduct, NewProduct, Product, UpdateProduct};
