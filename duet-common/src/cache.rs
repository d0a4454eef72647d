use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// 按类型缓存的共享实例
///
/// 注解转换器与方法级拦截器都按具体类型只创建一次，之后在所有调用和客户端克隆间共享。
/// 创建过程在锁内进行，同一类型不会被并发创建两次；创建失败不缓存。
pub struct InstanceCache<T: ?Sized> {
    kind: &'static str,
    instances: Mutex<HashMap<TypeId, Arc<T>>>,
}

impl<T: ?Sized> InstanceCache<T> {
    /// `kind` 只用于日志
    pub fn new(kind: &'static str) -> Self {
        InstanceCache {
            kind,
            instances: Mutex::new(HashMap::new()),
        }
    }

    fn instances(&self) -> MutexGuard<'_, HashMap<TypeId, Arc<T>>> {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_or_try_insert_with<E>(
        &self,
        id: TypeId,
        name: &str,
        create: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        let mut instances = self.instances();
        if let Some(instance) = instances.get(&id) {
            return Ok(Arc::clone(instance));
        }

        log::debug!("Creating {} {}", self.kind, name);
        let instance = create()?;
        instances.insert(id, Arc::clone(&instance));
        Ok(instance)
    }

    pub fn get_or_insert_with(&self, id: TypeId, name: &str, create: impl FnOnce() -> Arc<T>) -> Arc<T> {
        let mut instances = self.instances();
        Arc::clone(instances.entry(id).or_insert_with(|| {
            log::debug!("Creating {} {}", self.kind, name);
            create()
        }))
    }

    pub fn len(&self) -> usize {
        self.instances().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> fmt::Debug for InstanceCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::type_name;
    use std::fmt::Display;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key<K: ?Sized + 'static>() -> (TypeId, &'static str) {
        (TypeId::of::<K>(), type_name::<K>())
    }

    #[test]
    fn test_instances_are_created_once_per_type() {
        let created = AtomicUsize::new(0);
        let cache: InstanceCache<dyn Display + Send + Sync> = InstanceCache::new("label");
        let (id, name) = key::<u8>();

        let make = || {
            created.fetch_add(1, Ordering::SeqCst);
            Arc::new(7u8) as Arc<dyn Display + Send + Sync>
        };
        let first = cache.get_or_insert_with(id, name, make);
        let second = cache.get_or_insert_with(id, name, make);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let (id, name) = key::<String>();
        let other = cache.get_or_insert_with(id, name, || {
            Arc::new("x".to_string()) as Arc<dyn Display + Send + Sync>
        });
        assert_eq!(other.to_string(), "x");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_creation_is_not_cached() {
        let cache: InstanceCache<str> = InstanceCache::new("label");
        let (id, name) = key::<str>();

        let failed = cache.get_or_try_insert_with(id, name, || Err("boom"));
        assert_eq!(failed.err(), Some("boom"));
        assert!(cache.is_empty());

        let value = cache
            .get_or_try_insert_with::<&str>(id, name, || Ok(Arc::from("ok")))
            .unwrap();
        assert_eq!(&*value, "ok");
        assert_eq!(cache.len(), 1);
    }
}
