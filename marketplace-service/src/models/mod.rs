pub mod address;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, CreateAddress, UpdateAddress};
pub use cart::{Cart, CartItem, CartItemDetail, CartWithItems};
pub use category::Category;
pub use order::{
    ListOrdersFilter, Order, OrderItem, OrderItemDetail, OrderStatus, OrderWithItems,
};
pub use product::{
    CreateProduct, ListProductsFilter, Product, ProductDetail, UpdateProduct,
};
pub use user::{CreateUser, SanitizedUser, UpdateUser, User, UserRole};
