//! Role-binding authorization for the idgate gateway.
//!
//! A caller is allowed when a role bound to their email (as a `User` or
//! `ServiceAccount` subject) is on the [`RoleAllowList`]. Bindings come
//! from a [`RoleBindingLookup`]; in production that is
//! [`KubeRoleBindings`], which lists the cluster role bindings through the
//! Kubernetes API using the pod's service account.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use idgate_authz::{Authorizer, KubeClient, KubeRoleBindings, RoleAllowList, DEFAULT_LOOKUP_TIMEOUT};
//!
//! let client = Arc::new(KubeClient::in_cluster()?);
//! let authorizer = Authorizer::new(
//!     Arc::new(KubeRoleBindings::new(client)),
//!     RoleAllowList::default(),
//!     DEFAULT_LOOKUP_TIMEOUT,
//! );
//! let allowed = authorizer.authorize(&identity).await?;
//! ```

#![warn(missing_docs)]

mod authorizer;
mod binding;
mod error;
mod kube;
mod lookup;

pub use authorizer::{Authorizer, DEFAULT_LOOKUP_TIMEOUT};
pub use binding::{RoleAllowList, RoleBinding, SERVICE_ACCOUNT_KIND, USER_KIND};
pub use error::{AuthzError, AuthzResult};
pub use kube::{KubeClient, KubeConfig, KubeRoleBindings};
pub use lookup::{RoleBindingLookup, StaticRoleBindings};
