//! Macros for declaring state and trigger enums.

/// Generate a fieldless enum implementing [`State`](crate::core::State).
///
/// # Example
///
/// ```
/// use hfsm::state_enum;
/// use hfsm::core::State;
///
/// state_enum! {
///     pub enum Connection {
///         Disconnected,
///         Connecting,
///         Connected,
///     }
/// }
///
/// assert_eq!(Connection::Connecting.name(), "Connecting");
/// ```
#[macro_export]
macro_rules! state_enum {
    ($($body:tt)*) => {
        $crate::__identifier_enum! { $crate::core::State; $($body)* }
    };
}

/// Generate a fieldless enum implementing [`Trigger`](crate::core::Trigger).
///
/// # Example
///
/// ```
/// use hfsm::trigger_enum;
/// use hfsm::core::Trigger;
///
/// trigger_enum! {
///     pub enum Signal {
///         Connect,
///         Drop,
///     }
/// }
///
/// assert_eq!(Signal::Drop.name(), "Drop");
/// ```
#[macro_export]
macro_rules! trigger_enum {
    ($($body:tt)*) => {
        $crate::__identifier_enum! { $crate::core::Trigger; $($body)* }
    };
}

/// Shared expansion of `state_enum!` and `trigger_enum!`: a fieldless,
/// `Copy` enum whose `name()` is the variant identifier.
#[doc(hidden)]
#[macro_export]
macro_rules! __identifier_enum {
    (
        $identifier:path;
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $identifier for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
