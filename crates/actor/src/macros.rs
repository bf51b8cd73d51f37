/// Defines a new actor type.
///
/// Use this macro to both define an actor's state type and wrapper type.
/// The wrapper type can later have `impl` blocks to add some convenient
/// methods to interact with the actor.
///
/// Doc comments placed before `#[wrapper_type(..)]` go to the wrapper
/// type, attributes placed after it go to the state type:
///
/// ```ignore
/// define_actor! {
///     /// Documentation of the public wrapper.
///     #[wrapper_type(Counter)]
///     #[derive(Default)]
///     struct CounterState {
///         value: u32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! define_actor {
    {
        $(#[doc = $doc:expr])*
        #[wrapper_type($wrapper_type:ident)]
        $(#[$state_attr:meta])*
        $v:vis struct $state_type:ident {
            $($state_items:tt)*
        }
    } => {
        $(#[$state_attr])*
        struct $state_type {
            $($state_items)*
        }

        $(#[doc = $doc])*
        $v struct $wrapper_type {
            handle: $crate::Actor<$state_type>,
        }

        impl $wrapper_type {
            #[inline]
            fn spawn(
                state: $state_type,
                label: Option<&str>,
            ) -> $wrapper_type {
                let handle = $crate::Actor::spawn(state, label);
                $wrapper_type { handle }
            }

            #[inline]
            fn handle(&self) -> &$crate::Actor<$state_type> {
                &self.handle
            }
        }

        impl Clone for $wrapper_type {
            #[inline]
            fn clone(&self) -> Self {
                $wrapper_type {
                    handle: self.handle.clone(),
                }
            }
        }
    };
    {
        $(#[$($attrs:tt)*])*
        $v:vis struct $state_type:ident {
            $($state_items:tt)*
        }
    } => {
        compile_error!(
            "`#[wrapper_type(..)]` must follow the doc comments of the actor"
        );
    };
}
