//! Tests that need a wgpu adapter return early when none is available.
#[cfg(test)]
mod tests {
    use half::f16;
    use tessera::{ops, prelude::*, DeviceError, TensorError, WgpuDevice};

    fn accelerator() -> Option<WgpuDevice> {
        let _ = env_logger::builder().is_test(true).try_init();
        match Device::request_device(DeviceRequest::Accelerator) {
            Ok(Device::Accelerator(gpu)) => Some(gpu),
            Ok(Device::Host) => None,
            Err(e) => {
                log::warn!("Skipping accelerator test: {}", e);
                None
            }
        }
    }

    #[test]
    fn missing_adapter_is_an_initialization_error() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let nothing = DeviceRequest::AcceleratorOn(wgpu::Backends::empty());
        assert!(matches!(
            AcceleratorStorage::<f32>::request(shape![2], nothing),
            Err(TensorError::StorageInitialization(
                DeviceError::AdapterRequestFailed
            ))
        ));

        let storage = DynamicStorage::<f32>::requesting(shape![2], nothing)?;
        assert_eq!(storage.backend(), Backend::Host);
        assert_eq!(storage.to_vec()?, vec![0.0; 2]);
        Ok(())
    }

    #[test]
    fn element_round_trip() -> anyhow::Result<()> {
        let Some(gpu) = accelerator() else {
            return Ok(());
        };
        let mut storage = AcceleratorStorage::<f32>::on_device(shape![2, 3], &gpu)?;
        assert_eq!(storage.size(), 6);
        assert_eq!(storage.to_vec()?, vec![0.0; 6]);

        storage.set_element(4, 99.0)?;
        assert_eq!(storage.element_at(4)?, 99.0);
        assert_eq!(storage.element_at(3)?, 0.0);
        assert!(matches!(
            storage.element_at(6),
            Err(TensorError::OutOfRange { index: 6, bound: 6 })
        ));
        Ok(())
    }

    #[test]
    fn half_precision_writes_leave_neighbours_intact() -> anyhow::Result<()> {
        let Some(gpu) = accelerator() else {
            return Ok(());
        };
        let data = (0..5).map(|x| f16::from_f32(x as f32)).collect::<Vec<_>>();
        let mut storage = AcceleratorStorage::from_slice(&data, [5], &gpu)?;
        storage.set_element(1, f16::from_f32(42.0))?;
        storage.set_element(4, f16::from_f32(-3.0))?;

        let expected = [0.0, 42.0, 2.0, 3.0, -3.0].map(f16::from_f32).to_vec();
        assert_eq!(storage.to_vec()?, expected);
        assert_eq!(storage.element_at(1)?, f16::from_f32(42.0));
        assert_eq!(storage.element_at(2)?, f16::from_f32(2.0));
        Ok(())
    }

    #[test]
    fn resize_zeroes_and_rejects_empty_shapes() -> anyhow::Result<()> {
        let Some(gpu) = accelerator() else {
            return Ok(());
        };
        let mut storage = AcceleratorStorage::<i32>::on_device([3], &gpu)?;
        storage.fill(7)?;
        storage.resize(shape![2, 2])?;
        assert_eq!(storage.shape(), &shape![2, 2]);
        assert_eq!(storage.to_vec()?, vec![0; 4]);

        assert!(matches!(
            storage.resize(shape![0]),
            Err(TensorError::InvalidShape(_))
        ));
        assert_eq!(storage.size(), 4);
        Ok(())
    }

    #[test]
    fn ops_stay_on_the_accelerator() -> anyhow::Result<()> {
        let Some(gpu) = accelerator() else {
            return Ok(());
        };
        let device = Device::Accelerator(gpu);
        let a = DynamicStorage::from_slice(&[1.0f32, 2.0, 3.0], [3], &device)?;
        let b = DynamicStorage::from_slice(&[4.0f32, 5.0, 6.0], [3], &device)?;
        let c = ops::add(&a, &b)?;
        assert_eq!(c.backend(), Backend::Accelerator);
        assert_eq!(c.to_vec()?, vec![5.0, 7.0, 9.0]);

        let zeros = DynamicStorage::from_slice(&[0.0f32; 3], [3], &device)?;
        assert!(matches!(
            ops::div(&a, &zeros),
            Err(TensorError::DivisionByZero { index: 0 })
        ));
        Ok(())
    }

    #[test]
    fn storages_share_one_context() -> anyhow::Result<()> {
        let Some(gpu) = accelerator() else {
            return Ok(());
        };
        let a = AcceleratorStorage::<f32>::on_device([2], &gpu)?;
        let b = AcceleratorStorage::<f32>::on_device([2], &gpu)?;
        assert_eq!(a.device(), b.device());
        Ok(())
    }
}
