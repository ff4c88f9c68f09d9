use crate::{
    enums::SortBy,
    error::{FigureError, Result},
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::{fs, path::Path};

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a NIfTI file, or a directory holding one DICOM series stacked
    /// in `sort_by` order.
    ///
    /// # Errors
    ///
    /// Returns [`FigureError::UnsupportedFormat`] for anything else
    pub fn load(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Volume> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_from_directory(path, sort_by);
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Self::load_nifti(path)
        } else {
            Err(FigureError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }

    /// Load a NIfTI-1 file, scaled by its slope and intercept, with spacing
    /// from `pixdim`.
    pub fn load_nifti(path: impl AsRef<Path>) -> Result<Volume> {
        let path = path.as_ref();
        let object = ReaderOptions::new().read_file(path)?;
        let pixdim = object.header().pixdim;
        let array = object.into_volume().into_ndarray::<f32>()?;

        let shape = array.shape().to_vec();
        if shape.len() < 3 || shape[3..].iter().any(|&len| len != 1) {
            return Err(FigureError::NotVolumetric {
                path: path.to_path_buf(),
                ndim: shape.len(),
            });
        }
        let data = Array3::from_shape_vec(
            (shape[0], shape[1], shape[2]),
            array.iter().copied().collect(),
        )?;
        Ok(Volume::new(data, (pixdim[1], pixdim[2], pixdim[3])))
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    /// * `source` - Where the objects came from, for error reporting
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
        source: &Path,
    ) -> Result<Volume> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(FigureError::NoValidImages {
                path: source.to_path_buf(),
            });
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        if !Self::dimensions_match(&images) {
            return Err(FigureError::InconsistentDimensions {
                path: source.to_path_buf(),
            });
        }

        let spacing = Self::get_spacing(dicom_objects).ok_or_else(|| FigureError::MissingSpacing {
            path: source.to_path_buf(),
        })?;

        Ok(Volume::new(Self::build_volume_array(&images), spacing))
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Volume> {
        let path = path.as_ref();
        let paths: Vec<_> = fs::read_dir(path)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(FigureError::NoValidImages {
                path: path.to_path_buf(),
            });
        }

        let objects = paths
            .iter()
            .map(open_file)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::load_from_dicom_objects(&objects, sort_by, path)
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<(Option<f32>, Array2<f32>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<f32>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }
    }

    fn dimensions_match(images: &[Array2<f32>]) -> bool {
        let first_dim = images[0].dim();
        images.iter().all(|img| img.dim() == first_dim)
    }

    /// Stack (rows, columns) images into an (x, y, z) array: columns run
    /// along x, rows along y and images along z.
    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let mut volume = Array3::<f32>::zeros((width, height, images.len()));

        for (z, image) in images.iter().enumerate() {
            volume.slice_mut(s![.., .., z]).assign(&image.t());
        }

        volume
    }

    /// (column spacing, row spacing, slice thickness)
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Some((*pixel_spacing.get(1)?, *pixel_spacing.first()?, slice_thickness))
        })
    }
}
