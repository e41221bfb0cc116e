/// Generates a getter and a `set_` method per `Copy` property of a leaf node.
///
/// The node must provide `fn update(&self, f: impl FnOnce(&mut State)) -> Result<()>`
/// marking the node changed, and keep its properties in `self.state`. The
/// calling module must have `SceneGraphNode` in scope.
macro_rules! impl_node_properties {
    (
        $node:ident,
        // (field, type, doc)
        [ $(($field:ident, $ty:ty, $doc:expr)),* $(,)? ]
    ) => {
        impl $node {
            $(
                #[doc = $doc]
                #[must_use]
                pub fn $field(&self) -> $ty {
                    self.run_as_reader(|| self.state.read().$field)
                }

                paste::paste! {
                    #[doc = $doc]
                    pub fn [<set_ $field>](&self, value: $ty) -> $crate::errors::Result<()> {
                        self.update(|state| state.$field = value)
                    }
                }
            )*
        }
    };
}
