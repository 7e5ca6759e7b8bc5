pub mod member_repository;
pub mod role_repository;
