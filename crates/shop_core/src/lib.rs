pub mod domain;
pub mod ports;
pub mod pricing;
pub mod usecase;

pub use domain::{
    BasketAggregate, BasketLine, BasketProduct, BasketSelector, BasketStatus, BasketSummary,
    BasketView, Category, CategoryFilter, CategoryList, NewPost, NewProduct, NewSession, NewUser,
    Order, OrderFilter, OrderList, OrderPatch, OrderProduct, OrderStatus, Pagination,
    PendingLine, PictureLink, Post, PostFilter, PostList, PostPatch, Product, ProductFilter,
    ProductList, ProductPatch, Session, User, UserCredentials, UserLookup, UserPatch, UserRole,
};
pub use ports::{
    BasketRepository, CacheService, CategoryRepository, MailService, MediaStorage,
    OrderRepository, PolicyEnforcer, PortError, PortResult, PostRepository, ProductRepository,
    SessionRepository, UserRepository,
};
pub use usecase::Repositories;
