/// Back-office entities module
pub mod attendance_record;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod restock_record;
pub mod user;

// Re-export entities
pub use attendance_record::{
    AttendanceStatus, Entity as AttendanceRecord, Model as AttendanceRecordModel,
};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use restock_record::{Entity as RestockRecord, Model as RestockRecordModel};
pub use user::{Capability, Entity as User, Model as UserModel, Role};
