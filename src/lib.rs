//! Monte Carlo photon transport on voxelized geometries.
//!
//! The crate transports individual photon histories through a [`VoxelGrid`]
//! of materials using delta tracking against a global majorant cross
//! section, scoring surface and volume tallies along the way. Cross
//! sections come from a JSON [`CrossSectionLibrary`]; energies are in eV,
//! lengths in cm.
//!
//! A minimal run wires together interaction data, a grid, a source and
//! settings into a [`Simulation`]:
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use photon_mc::{
//!     CrossSectionLibrary, Directionality, EnergySpectrum, InteractionData, PhotonSource,
//!     RangePolicy, Settings, Simulation, SourceGeometry, VoxelGrid,
//! };
//!
//! # fn main() -> photon_mc::Result<()> {
//! let library = CrossSectionLibrary::from_file("data/xs_library.json")?;
//! let data = InteractionData::from_library(&["aluminum"], &library, RangePolicy::Clamp)?;
//! let grid = VoxelGrid::homogeneous(
//!     [20, 20, 20],
//!     Vector3::new(0.1, 0.1, 0.1),
//!     Vector3::zeros(),
//!     1,
//! )?;
//! let source = PhotonSource::new(
//!     SourceGeometry::Point { position: Vector3::new(1.0, 1.0, -1.0) },
//!     EnergySpectrum::monoenergetic(3.0e4)?,
//!     Directionality::beam(Vector3::new(0.0, 0.0, 1.0))?,
//! );
//! let mut simulation = Simulation::new(data, grid, source, Settings::default());
//! let summary = simulation.run()?;
//! println!("{} histories, {} escaped", summary.histories, summary.escaped);
//! # Ok(())
//! # }
//! ```

pub mod distributions;
pub mod engine;
pub mod error;
pub mod grid;
pub mod interaction_data;
pub mod interpolate;
pub mod library;
pub mod material;
pub mod particle;
pub mod physics;
pub mod quantity;
pub mod rng;
pub mod settings;
pub mod simulation;
pub mod source;
pub mod tally;

pub use engine::{HistoryOutcome, PhysicsEngine, Terminal};
pub use error::{Result, TransportError};
pub use grid::{VolumeDescription, VoxelGrid};
pub use interaction_data::{InteractionData, RangePolicy};
pub use library::{ChannelTable, CrossSectionLibrary, MaterialRecord};
pub use material::{Channel, Material};
pub use particle::{Photon, ScatterHistory};
pub use quantity::{Provenance, Quantity, QuantityContainer};
pub use rng::HistoryRng;
pub use settings::Settings;
pub use simulation::{RunSummary, Simulation, StopToken};
pub use source::{Directionality, EnergySpectrum, PhotonSource, SourceGeometry};
pub use tally::{AACuboid, SurfaceTally, TallyStep, Traversal, VolumeTally};
